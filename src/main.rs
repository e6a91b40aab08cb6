use imexpr::{command, ExprError, MemoryStore};

use std::io::{self, Read};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let input = if args.is_empty() {
        let mut buf = String::new();
        if io::stdin().read_to_string(&mut buf).is_err() {
            eprintln!("Failed to read stdin");
            std::process::exit(1);
        }
        buf
    } else {
        args.join(" ")
    };
    let input = input.trim();

    let store = MemoryStore::new();
    match command(input, &store) {
        Ok(node) => {
            println!("type:  {}", node.dtype());
            println!("shape: {:?}", node.shape());
            match node.eval() {
                Ok(value) => println!("value: {:?}", value),
                Err(err) => {
                    eprintln!("{}", err);
                    std::process::exit(1);
                }
            }
        }
        Err(ExprError::Parse {
            message,
            begin,
            end,
        }) => {
            let lines: Vec<&str> = input.lines().collect();
            let line_text = lines.get(begin.line).unwrap_or(&"");

            eprintln!("ERROR AT LINE {}:", begin.line + 1);
            eprintln!("{}", line_text);

            // Build the underline
            let start_col = begin.column;
            let end_col = if begin.line == end.line && end.column > begin.column {
                end.column
            } else {
                // Point error or spans multiple lines: underline to end of line
                if start_col < line_text.len() {
                    line_text.len()
                } else {
                    start_col + 1
                }
            };

            let mut underline = String::new();
            for _ in 0..start_col {
                underline.push(' ');
            }
            underline.push('^');
            if end_col > start_col + 1 {
                for _ in (start_col + 1)..end_col {
                    underline.push('_');
                }
            }

            eprintln!("{}", underline);
            eprintln!("{}", message);
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}
