use std::env;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::process::ExitCode;

use yamlstream::{EventData, Parser, ScalarStyle};

fn test_main(stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    let mut input = Vec::new();
    stdin.read_to_end(&mut input)?;
    let mut bytes = input.as_slice();
    let mut parser = Parser::new();
    parser.set_input_string(&mut bytes);

    loop {
        let event = parser.parse()?;
        let mut is_end = false;
        match &event.data {
            EventData::StreamStart { .. } => writeln!(stdout, "+STR")?,
            EventData::StreamEnd => {
                is_end = true;
                writeln!(stdout, "-STR")?;
            }
            EventData::DocumentStart { implicit, .. } => {
                write!(stdout, "+DOC")?;
                if !*implicit {
                    write!(stdout, " ---")?;
                }
                writeln!(stdout)?;
            }
            EventData::DocumentEnd { implicit } => {
                write!(stdout, "-DOC")?;
                if !*implicit {
                    write!(stdout, " ...")?;
                }
                writeln!(stdout)?;
            }
            EventData::Alias { anchor } => writeln!(stdout, "=ALI *{anchor}")?,
            EventData::Scalar {
                anchor,
                tag,
                value,
                style,
                ..
            } => {
                write!(stdout, "=VAL")?;
                if let Some(anchor) = anchor {
                    write!(stdout, " &{anchor}")?;
                }
                if let Some(tag) = tag {
                    write!(stdout, " <{tag}>")?;
                }
                let indicator = match style {
                    ScalarStyle::Plain | ScalarStyle::Any => ":",
                    ScalarStyle::SingleQuoted => "'",
                    ScalarStyle::DoubleQuoted => "\"",
                    ScalarStyle::Literal => "|",
                    ScalarStyle::Folded => ">",
                    _ => unreachable!("unknown scalar style"),
                };
                write!(stdout, " {indicator}")?;
                write_escaped(stdout, value)?;
                writeln!(stdout)?;
            }
            EventData::SequenceStart { anchor, tag, .. } => {
                write!(stdout, "+SEQ")?;
                if let Some(anchor) = anchor {
                    write!(stdout, " &{anchor}")?;
                }
                if let Some(tag) = tag {
                    write!(stdout, " <{tag}>")?;
                }
                writeln!(stdout)?;
            }
            EventData::SequenceEnd => writeln!(stdout, "-SEQ")?,
            EventData::MappingStart { anchor, tag, .. } => {
                write!(stdout, "+MAP")?;
                if let Some(anchor) = anchor {
                    write!(stdout, " &{anchor}")?;
                }
                if let Some(tag) = tag {
                    write!(stdout, " <{tag}>")?;
                }
                writeln!(stdout)?;
            }
            EventData::MappingEnd => writeln!(stdout, "-MAP")?,
        }
        if is_end {
            break;
        }
    }
    Ok(())
}

fn write_escaped(stdout: &mut dyn Write, value: &str) -> io::Result<()> {
    for ch in value.chars() {
        match ch {
            '\\' => write!(stdout, "\\\\")?,
            '\0' => write!(stdout, "\\0")?,
            '\x08' => write!(stdout, "\\b")?,
            '\n' => write!(stdout, "\\n")?,
            '\r' => write!(stdout, "\\r")?,
            '\t' => write!(stdout, "\\t")?,
            _ => write!(stdout, "{ch}")?,
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut stdout = io::stdout().lock();
    let result = if let Some(path) = args.get(1) {
        match File::open(path) {
            Ok(file) => {
                let mut reader = BufReader::new(file);
                test_main(&mut reader, &mut stdout)
            }
            Err(err) => Err(err.into()),
        }
    } else {
        let mut stdin = io::stdin().lock();
        test_main(&mut stdin, &mut stdout)
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
