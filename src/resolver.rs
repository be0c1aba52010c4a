use std::borrow::Cow;

use regex::Regex;

use crate::error::ResolverError;
use crate::{BOOL_TAG, FLOAT_TAG, INT_TAG, MAP_TAG, NULL_TAG, SEQ_TAG, STR_TAG};

/// The kind of an unresolved node.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
}

/// A node whose tag is being inferred.
#[derive(Copy, Clone, Debug)]
#[non_exhaustive]
pub struct UnresolvedNode<'a> {
    pub kind: NodeKind,
    /// The scalar content; `None` for collections.
    pub value: Option<&'a str>,
    /// Whether the scalar was (or would be) rendered in the plain style.
    /// Only plain scalars resolve to anything other than `!!str`.
    pub plain: bool,
}

/// Infers a tag for an untagged node.
pub trait Resolver {
    fn resolve(&mut self, node: UnresolvedNode<'_>) -> Result<Cow<'static, str>, ResolverError>;
}

/// The standard YAML 1.1 resolver: recognizes `!!null`, `!!bool`, `!!int`
/// and `!!float` by scalar content, with `!!str` as the fallback.
pub struct StandardResolver {
    null: Regex,
    bool_: Regex,
    int: Regex,
    float: Regex,
}

impl Default for StandardResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardResolver {
    pub fn new() -> Self {
        StandardResolver {
            null: Regex::new(r"^(?:~|null|Null|NULL|)$").expect("valid built-in pattern"),
            bool_: Regex::new(
                r"^(?:y|Y|yes|Yes|YES|n|N|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF)$",
            )
            .expect("valid built-in pattern"),
            int: Regex::new(
                r"^(?:[-+]?(?:0|[1-9][0-9_]*)|0o[0-7_]+|0x[0-9A-Fa-f_]+|[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+)$",
            )
            .expect("valid built-in pattern"),
            float: Regex::new(
                r"^(?:[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?|[-+]?\.[0-9_]+(?:[eE][-+]?[0-9]+)?|[-+]?[0-9][0-9_]*[eE][-+]?[0-9]+|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
            )
            .expect("valid built-in pattern"),
        }
    }
}

impl Resolver for StandardResolver {
    fn resolve(&mut self, node: UnresolvedNode<'_>) -> Result<Cow<'static, str>, ResolverError> {
        let tag = match node.kind {
            NodeKind::Sequence => SEQ_TAG,
            NodeKind::Mapping => MAP_TAG,
            NodeKind::Scalar => {
                let Some(value) = node.value else {
                    return Ok(Cow::Borrowed(STR_TAG));
                };
                if !node.plain {
                    STR_TAG
                } else if self.null.is_match(value) {
                    NULL_TAG
                } else if self.bool_.is_match(value) {
                    BOOL_TAG
                } else if self.int.is_match(value) {
                    INT_TAG
                } else if self.float.is_match(value) {
                    FLOAT_TAG
                } else {
                    STR_TAG
                }
            }
        };
        Ok(Cow::Borrowed(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_plain(value: &str) -> String {
        StandardResolver::new()
            .resolve(UnresolvedNode {
                kind: NodeKind::Scalar,
                value: Some(value),
                plain: true,
            })
            .unwrap()
            .into_owned()
    }

    #[test]
    fn null_values() {
        for value in ["", "~", "null", "Null", "NULL"] {
            assert_eq!(resolve_plain(value), NULL_TAG, "{value:?}");
        }
    }

    #[test]
    fn bool_values() {
        for value in ["y", "yes", "Yes", "TRUE", "off", "On", "n", "NO", "false"] {
            assert_eq!(resolve_plain(value), BOOL_TAG, "{value:?}");
        }
        assert_eq!(resolve_plain("yess"), STR_TAG);
    }

    #[test]
    fn int_values() {
        for value in ["0", "42", "-17", "+3", "0x1F", "0o17", "1_000", "1:30:00"] {
            assert_eq!(resolve_plain(value), INT_TAG, "{value:?}");
        }
        assert_eq!(resolve_plain("08"), STR_TAG);
    }

    #[test]
    fn float_values() {
        for value in ["3.14", "-0.5", "1e3", ".5", "2.", ".inf", "-.inf", ".nan", "6.02e+23"] {
            assert_eq!(resolve_plain(value), FLOAT_TAG, "{value:?}");
        }
        assert_eq!(resolve_plain("1.2.3"), STR_TAG);
    }

    #[test]
    fn quoted_scalars_are_strings() {
        let mut resolver = StandardResolver::new();
        let tag = resolver
            .resolve(UnresolvedNode {
                kind: NodeKind::Scalar,
                value: Some("true"),
                plain: false,
            })
            .unwrap();
        assert_eq!(tag, STR_TAG);
    }

    #[test]
    fn collection_kinds() {
        let mut resolver = StandardResolver::new();
        let seq = resolver
            .resolve(UnresolvedNode {
                kind: NodeKind::Sequence,
                value: None,
                plain: false,
            })
            .unwrap();
        assert_eq!(seq, SEQ_TAG);
        let map = resolver
            .resolve(UnresolvedNode {
                kind: NodeKind::Mapping,
                value: None,
                plain: false,
            })
            .unwrap();
        assert_eq!(map, MAP_TAG);
    }
}
