use std::collections::BTreeSet;

use serde_json::Value as Json;

/// Display width of a string where everything outside the ASCII
/// half-width range counts as two columns.
fn display_width(text: &str) -> usize {
    text.chars()
        .map(|c| if c.is_ascii() { 1 } else { 2 })
        .sum()
}

fn cell_text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

/// Renders row-shaped JSON as a simple `+---+` bordered table. A single
/// object becomes a one-row table; anything non-tabular falls back to
/// pretty-printed JSON.
pub fn print_rows(data: &Json) {
    let rows: Vec<&serde_json::Map<String, Json>> = match data {
        Json::Object(obj) => vec![obj],
        Json::Array(items) => {
            let objs: Vec<_> = items.iter().filter_map(|i| i.as_object()).collect();
            if objs.len() != items.len() {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
                return;
            }
            objs
        }
        other => {
            println!("{other}");
            return;
        }
    };
    if rows.is_empty() {
        println!("No data to print");
        return;
    }

    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    let columns: Vec<&str> = columns.into_iter().collect();

    let mut widths: Vec<usize> = columns
        .iter()
        .map(|col| display_width(col).max(2))
        .collect();
    for row in &rows {
        for (i, col) in columns.iter().enumerate() {
            let text = row.get(*col).map(cell_text).unwrap_or_default();
            widths[i] = widths[i].max(display_width(&text));
        }
    }

    let separator: String = {
        let mut s = String::from("+");
        for width in &widths {
            s.push_str(&"-".repeat(width + 2));
            s.push('+');
        }
        s
    };

    println!("{separator}");
    print_row(&columns.iter().map(|c| c.to_string()).collect::<Vec<_>>(), &widths);
    println!("{separator}");
    for row in &rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|col| row.get(*col).map(cell_text).unwrap_or_default())
            .collect();
        print_row(&cells, &widths);
    }
    println!("{separator}");
}

fn print_row(cells: &[String], widths: &[usize]) {
    let mut line = String::from("|");
    for (cell, &width) in cells.iter().zip(widths) {
        let mut text = cell.clone();
        if display_width(&text) > width {
            text = truncate_to_width(&text, width.saturating_sub(3));
            text.push_str("...");
        }
        let pad = width.saturating_sub(display_width(&text));
        line.push(' ');
        line.push_str(&text);
        line.push_str(&" ".repeat(pad));
        line.push_str(" |");
    }
    println!("{line}");
}

fn truncate_to_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = if c.is_ascii() { 1 } else { 2 };
        if used + w > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_counts_one_wide_counts_two() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("知识库"), 6);
        assert_eq!(display_width("kb知"), 4);
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("abcdef", 4), "abcd");
        assert_eq!(truncate_to_width("知识库", 4), "知识");
        // A wide char never gets split in half.
        assert_eq!(truncate_to_width("a知识", 2), "a");
    }

    #[test]
    fn cell_text_unquotes_strings() {
        assert_eq!(cell_text(&Json::String("x".into())), "x");
        assert_eq!(cell_text(&Json::Null), "");
        assert_eq!(cell_text(&serde_json::json!(3)), "3");
    }
}
