use std::env;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::ExitCode;

use yamlstream::{
    Emitter, Encoding, Event, MappingStyle, ScalarStyle, SequenceStyle,
};

fn test_main(stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    let mut emitter = Emitter::new();
    emitter.set_output(stdout);
    emitter.set_canonical(false);
    emitter.set_unicode(false);

    let mut buf = BufReader::new(stdin);
    let mut line_buffer = String::with_capacity(1024);
    let mut value_buffer = String::with_capacity(128);

    loop {
        line_buffer.clear();
        let n = buf.read_line(&mut line_buffer)?;
        if n == 0 {
            return Ok(());
        }
        let line = line_buffer.strip_suffix('\n').unwrap_or(&line_buffer);

        let event = if line.starts_with("+STR") {
            Event::stream_start(Encoding::Utf8)
        } else if line.starts_with("-STR") {
            Event::stream_end()
        } else if line.starts_with("+DOC") {
            let implicit = !line[4..].starts_with(" ---");
            Event::document_start(None, &[], implicit)
        } else if line.starts_with("-DOC") {
            let implicit = !line[4..].starts_with(" ...");
            Event::document_end(implicit)
        } else if line.starts_with("+MAP") {
            Event::mapping_start(
                get_anchor('&', line),
                get_tag(line),
                false,
                MappingStyle::Block,
            )
        } else if line.starts_with("-MAP") {
            Event::mapping_end()
        } else if line.starts_with("+SEQ") {
            Event::sequence_start(
                get_anchor('&', line),
                get_tag(line),
                false,
                SequenceStyle::Block,
            )
        } else if line.starts_with("-SEQ") {
            Event::sequence_end()
        } else if line.starts_with("=VAL") {
            let mut style = ScalarStyle::Any;
            let value = get_value(line, &mut value_buffer, &mut style);
            let implicit = get_tag(line).is_none();
            Event::scalar(
                get_anchor('&', line),
                get_tag(line),
                value,
                implicit,
                implicit,
                style,
            )
        } else if line.starts_with("=ALI") {
            Event::alias(get_anchor('*', line).expect("no alias name"))
        } else {
            return Err(format!("unknown event: '{line}'").into());
        };

        emitter.emit(event)?;
    }
}

fn get_anchor(sigil: char, line: &str) -> Option<&str> {
    let (_, from_sigil) = line.split_once(sigil)?;
    if let Some((until_space, _tail)) = from_sigil.split_once(' ') {
        Some(until_space)
    } else if !from_sigil.is_empty() {
        Some(from_sigil)
    } else {
        None
    }
}

fn get_tag(line: &str) -> Option<&str> {
    let (_, from_angle_open) = line.split_once('<')?;
    let (until_angle_close, _) = from_angle_open.split_once('>')?;
    Some(until_angle_close)
}

fn get_value<'a>(line: &str, buffer: &'a mut String, style: &mut ScalarStyle) -> &'a str {
    let mut remainder = line;
    let value = loop {
        let Some((_before, tail)) = remainder.split_once(' ') else {
            panic!("invalid line: {line}");
        };
        let indicator = tail.chars().next().expect("empty event field");
        match indicator {
            ':' => {
                *style = ScalarStyle::Plain;
                break &tail[1..];
            }
            '\'' => {
                *style = ScalarStyle::SingleQuoted;
                break &tail[1..];
            }
            '"' => {
                *style = ScalarStyle::DoubleQuoted;
                break &tail[1..];
            }
            '|' => {
                *style = ScalarStyle::Literal;
                break &tail[1..];
            }
            '>' => {
                *style = ScalarStyle::Folded;
                break &tail[1..];
            }
            _ => remainder = tail,
        }
    };
    buffer.clear();
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next().expect("unterminated escape") {
                '\\' => buffer.push('\\'),
                '0' => buffer.push('\0'),
                'b' => buffer.push('\x08'),
                'n' => buffer.push('\n'),
                'r' => buffer.push('\r'),
                't' => buffer.push('\t'),
                other => panic!("unknown escape: \\{other}"),
            }
        } else {
            buffer.push(ch);
        }
    }
    buffer
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
