//! Tables printed by the inspection commands

use prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE;
use prettytable::{Cell, Row, Table};

/// Empty table with a bold title row.
pub fn listing(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        headers
            .iter()
            .map(|header| Cell::new(header).style_spec("b"))
            .collect(),
    ));
    table
}

pub fn push_row<I>(table: &mut Table, cells: I)
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    table.add_row(Row::new(
        cells.into_iter().map(|cell| Cell::new(cell.as_ref())).collect(),
    ));
}

/// Name/value summary of a parsed file, names right aligned.
pub fn properties<K: AsRef<str>>(rows: &[(K, String)]) -> Table {
    let mut table = listing(&["Property", "Value"]);
    for (name, value) in rows {
        table.add_row(Row::new(vec![
            Cell::new(name.as_ref()).style_spec("r"),
            Cell::new(value),
        ]));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_properties_keeps_row_order() {
        let table = properties(&[("Bones", "2".to_owned()), ("Meshes", "1".to_owned())]);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0][0].get_content(), "Bones");
        assert_eq!(table[1][1].get_content(), "1");
    }

    #[test]
    fn test_push_row_accepts_owned_and_borrowed_cells() {
        let mut table = listing(&["Member", "Size"]);
        push_row(&mut table, ["a.tex", "12 B"]);
        push_row(&mut table, vec!["b.mod".to_owned(), "1 KiB".to_owned()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table[1][0].get_content(), "b.mod");
    }
}
