//! Text tables

/// Render rows under headers as a bordered, left-aligned table
///
/// ```text
/// +----+-------+
/// | ID | TITLE |
/// +----+-------+
/// | 1  | Intro |
/// +----+-------+
/// ```
pub fn render_table<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.as_ref().chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let border = {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&"-".repeat(w + 2));
            line.push('+');
        }
        line
    };

    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    push_row(&mut out, headers.iter().map(|h| h.as_ref()), &widths);
    out.push_str(&border);
    out.push('\n');
    if !rows.is_empty() {
        for row in rows {
            push_row(&mut out, row.iter().map(String::as_str), &widths);
        }
        out.push_str(&border);
        out.push('\n');
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    out.push('|');
    let mut cells = cells;
    for w in widths {
        let cell = cells.next().unwrap_or("");
        out.push(' ');
        out.push_str(cell);
        out.push_str(&" ".repeat(w - cell.chars().count() + 1));
        out.push('|');
    }
    out.push('\n');
}
