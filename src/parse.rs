// Quote characters that open and close an atomic span
const QUOTES: [char; 3] = ['"', '\'', '`'];

// ASCII whitespace only; NBSP and other Unicode spaces stay inside tokens
fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

// Splits a command into tokens while respecting quotes.
//
// Only one quote kind is active at a time; a different quote char inside an
// active span is an ordinary character. With `keep_quotes` the delimiting
// quotes stay in the token, otherwise only the inner ones do.
pub fn tokenize(input: &str, keep_quotes: bool) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoting: Option<char> = None;

    for c in input.chars() {
        match (quoting, c) {
            // Opening quote
            (None, q) if QUOTES.contains(&q) => {
                quoting = Some(q);
                if keep_quotes {
                    current.push(q);
                }
            }
            // Closing quote of the same kind
            (Some(open), q) if q == open => {
                quoting = None;
                if keep_quotes {
                    current.push(q);
                }
            }
            (None, ws) if is_separator(ws) => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    // Unterminated quotes fall through here as part of the last token
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
