//! Column-subset projections of the dataset.
//!
//! Selection order is significant: many analyses treat the first selected
//! variable differently (e.g. as the dependent variable), so a slice follows
//! the caller's ordering, not the physical column order.

use crate::variable::Variable;

/// Rows restricted to the selected columns, plus the names that matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlicedData {
    pub rows: Vec<Vec<String>>,
    pub omitted: Vec<String>,
}

fn resolve<'a>(variables: &'a [Variable], selected: &[String]) -> (Vec<&'a Variable>, Vec<String>) {
    let mut found = Vec::with_capacity(selected.len());
    let mut omitted = Vec::new();
    for name in selected {
        match variables.iter().find(|v| &v.name == name) {
            Some(v) => found.push(v),
            None => omitted.push(name.clone()),
        }
    }
    (found, omitted)
}

/// Project `rows` onto the columns of `selected`, in selection order.
/// Unknown names are skipped and reported in [`SlicedData::omitted`].
pub fn get_sliced_data(rows: &[Vec<String>], variables: &[Variable], selected: &[String]) -> SlicedData {
    let (found, omitted) = resolve(variables, selected);
    for name in &omitted {
        log::debug!("Variable '{}' not found, omitted from selection", name);
    }

    let rows = rows
        .iter()
        .map(|row| {
            found
                .iter()
                .map(|v| row.get(v.column_index).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    SlicedData { rows, omitted }
}

/// Metadata for `selected`, in selection order. Unknown names are skipped.
pub fn get_var_defs(variables: &[Variable], selected: &[String]) -> Vec<Variable> {
    resolve(variables, selected).0.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(names: &[&str]) -> Vec<Variable> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let mut v = Variable::new(*n);
                v.column_index = i;
                v
            })
            .collect()
    }

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_selection_order_is_preserved() {
        let data = rows(&[&["1", "2"], &["3", "4"]]);
        let variables = vars(&["A", "B"]);

        let sliced = get_sliced_data(&data, &variables, &names(&["B", "A"]));
        assert_eq!(sliced.rows, rows(&[&["2", "1"], &["4", "3"]]));
        assert!(sliced.omitted.is_empty());
    }

    #[test]
    fn test_subset_of_three_columns() {
        let data = rows(&[&["a1", "b1", "c1"], &["a2", "b2", "c2"]]);
        let variables = vars(&["A", "B", "C"]);

        let sliced = get_sliced_data(&data, &variables, &names(&["C", "A"]));
        assert_eq!(sliced.rows, rows(&[&["c1", "a1"], &["c2", "a2"]]));

        let defs = get_var_defs(&variables, &names(&["C", "A"]));
        let def_names: Vec<_> = defs.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(def_names, vec!["C", "A"]);
    }

    #[test]
    fn test_unknown_names_are_omitted() {
        let data = rows(&[&["1", "2"]]);
        let variables = vars(&["A", "B"]);

        let sliced = get_sliced_data(&data, &variables, &names(&["Z", "B"]));
        assert_eq!(sliced.rows, rows(&[&["2"]]));
        assert_eq!(sliced.omitted, names(&["Z"]));
        assert_eq!(get_var_defs(&variables, &names(&["Z", "B"])).len(), 1);
    }

    #[test]
    fn test_empty_selection_keeps_row_count() {
        let data = rows(&[&["1"], &["2"]]);
        let sliced = get_sliced_data(&data, &vars(&["A"]), &[]);
        assert_eq!(sliced.rows.len(), 2);
        assert!(sliced.rows.iter().all(|r| r.is_empty()));
    }
}
