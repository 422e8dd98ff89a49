//! Log message interpolation.

/// Substitute `{name}` placeholders in `template` from `fields`.
///
/// `{{` and `}}` escape literal braces. A missing field never fails the
/// call; the result is a diagnostic line naming the problem instead of the
/// interpolated message.
pub fn interpolate(template: &str, fields: &[(&str, &str)]) -> String {
    match try_interpolate(template, fields) {
        Ok(message) => message,
        Err(missing) => format!(
            "Failed to interpolate log message: {template} with args: {fields:?}. \
             Error: missing field `{missing}`"
        ),
    }
}

fn try_interpolate(template: &str, fields: &[(&str, &str)]) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        // Unterminated placeholder: keep it literal.
                        None => {
                            out.push('{');
                            out.push_str(&name);
                            return Ok(out);
                        }
                    }
                }
                match fields.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(value),
                    None => return Err(name),
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_named_fields() {
        let message = interpolate("Hello {name}, {count} updates", &[("name", "ada"), ("count", "3")]);
        assert_eq!(message, "Hello ada, 3 updates");
    }

    #[test]
    fn test_missing_field_degrades_to_diagnostic() {
        let message = interpolate("Hello {name}", &[]);
        assert!(message.contains("Failed to interpolate"));
        assert!(message.contains("Hello {name}"));
        assert!(message.contains("`name`"));
    }

    #[test]
    fn test_escaped_braces() {
        let message = interpolate("literal {{brace}} and {x}", &[("x", "y")]);
        assert_eq!(message, "literal {brace} and y");
    }

    #[test]
    fn test_unterminated_placeholder_stays_literal() {
        let message = interpolate("oops {name", &[("name", "x")]);
        assert_eq!(message, "oops {name");
    }
}
