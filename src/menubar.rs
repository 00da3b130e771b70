use std::io::Write;

use crossterm::{queue, style};

/// Print a menu item string, bolding any text inside `[...]` brackets.
/// Text outside brackets is printed dim.
pub fn print_menu_item<W: Write>(out: &mut W, item: &str) -> anyhow::Result<()> {
    let mut rest = item;
    while !rest.is_empty() {
        let Some(open) = rest.find('[') else {
            queue!(
                out,
                style::SetAttribute(style::Attribute::Dim),
                style::Print(rest),
                style::SetAttribute(style::Attribute::Reset),
            )?;
            break;
        };
        if open > 0 {
            queue!(
                out,
                style::SetAttribute(style::Attribute::Dim),
                style::Print(&rest[..open]),
                style::SetAttribute(style::Attribute::Reset),
            )?;
        }
        rest = &rest[open..];
        match rest.find(']') {
            Some(close) => {
                queue!(
                    out,
                    style::SetAttribute(style::Attribute::Bold),
                    style::Print(&rest[..=close]),
                    style::SetAttribute(style::Attribute::Reset),
                )?;
                rest = &rest[close + 1..];
            }
            None => {
                queue!(out, style::Print(rest))?;
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(item: &str) -> String {
        let mut out = Vec::new();
        print_menu_item(&mut out, item).expect("print");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn bracketed_key_is_bold_and_label_dim() {
        let text = rendered("[p] controls");
        let key = text.find("[p]").expect("key printed");
        let label = text.find(" controls").expect("label printed");
        assert!(key < label);
        // SGR 1 is bold, SGR 2 is dim.
        assert!(text[..key].ends_with("\x1b[1m"));
        assert!(text[..label].ends_with("\x1b[2m"));
    }

    #[test]
    fn unclosed_bracket_is_printed_verbatim() {
        assert!(rendered("[Esc quit").ends_with("[Esc quit"));
    }
}
