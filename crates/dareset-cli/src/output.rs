use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    print!("{}", render_table(headers, &rows));
}

/// Left-aligned columns separated by two spaces. The last column is not
/// padded so long command lines do not drag trailing whitespace.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let render_row = |cells: Vec<&str>| -> String {
        let last = cells.len().saturating_sub(1);
        let line: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                if i == last {
                    cell.to_string()
                } else {
                    format!("{:width$}", cell, width = w)
                }
            })
            .collect();
        line.join("  ")
    };

    let mut out = String::new();
    out.push_str(&render_row(headers.to_vec()));
    out.push('\n');
    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&sep.join("  "));
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row.iter().map(|c| c.as_str()).collect()));
        out.push('\n');
    }
    out
}
