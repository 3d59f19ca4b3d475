use crate::core::dataset::{Cell, Dataset, format_brl, parse_price};

/// Presenter over the current dataset: holds one filter string per column
/// and derives the visible row set. Filtering never mutates the dataset;
/// row and column order are always preserved.
pub struct TableView {
    dataset: Dataset,
    filters: Vec<String>,
    produto_col: Option<usize>,
    plataforma_col: Option<usize>,
    preco_col: Option<usize>,
}

impl TableView {
    pub fn new(dataset: Dataset) -> Self {
        let produto_col = dataset.column_index("PRODUTO");
        let plataforma_col = dataset.column_index("PLATAFORMA");
        let preco_col = dataset.column_index("PREÇO");
        let filters = vec![String::new(); dataset.columns.len()];
        Self {
            dataset,
            filters,
            produto_col,
            plataforma_col,
            preco_col,
        }
    }

    pub fn empty() -> Self {
        Self::new(Dataset::default())
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn columns(&self) -> &[String] {
        &self.dataset.columns
    }

    /// Replace the dataset wholesale (a refresh or reload). Filters are
    /// rebuilt from scratch since the column set may have changed.
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        *self = Self::new(dataset);
    }

    pub fn set_filter(&mut self, column: &str, text: &str) {
        if let Some(idx) = self.dataset.column_index(column) {
            self.set_filter_at(idx, text.to_string());
        }
    }

    pub fn set_filter_at(&mut self, idx: usize, text: String) {
        if let Some(slot) = self.filters.get_mut(idx) {
            *slot = text;
        }
    }

    pub fn filter_at(&self, idx: usize) -> &str {
        self.filters.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn push_filter_char(&mut self, idx: usize, c: char) {
        if let Some(slot) = self.filters.get_mut(idx) {
            slot.push(c);
        }
    }

    pub fn pop_filter_char(&mut self, idx: usize) {
        if let Some(slot) = self.filters.get_mut(idx) {
            slot.pop();
        }
    }

    pub fn clear_filter_at(&mut self, idx: usize) {
        if let Some(slot) = self.filters.get_mut(idx) {
            slot.clear();
        }
    }

    pub fn has_active_filters(&self) -> bool {
        self.filters.iter().any(|f| !f.trim().is_empty())
    }

    /// Indices of the rows passing every active filter, in dataset order.
    /// A row passes a filter when the cell's unformatted string form
    /// contains the filter text, case-insensitively.
    pub fn render(&self) -> Vec<usize> {
        self.dataset
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| self.row_matches(row))
            .map(|(i, _)| i)
            .collect()
    }

    fn row_matches(&self, row: &[Cell]) -> bool {
        self.filters.iter().enumerate().all(|(i, filter)| {
            let filter = filter.trim();
            if filter.is_empty() {
                return true;
            }
            let needle = filter.to_lowercase();
            row.get(i)
                .map(|cell| cell.string_form().to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    }

    /// The designated columns whose filter is chosen from a fixed list of
    /// the column's distinct values instead of typed freely. The matching
    /// semantics stay identical substring containment.
    pub fn is_selection_column(&self, idx: usize) -> bool {
        Some(idx) == self.produto_col || Some(idx) == self.plataforma_col
    }

    pub fn selection_values(&self, idx: usize) -> Vec<String> {
        self.dataset.distinct_values(idx)
    }

    /// Display form of a cell: the price column renders as BRL currency,
    /// everything else as its raw string form. Filtering always uses the
    /// unformatted value.
    pub fn display_cell(&self, row: usize, col: usize) -> String {
        let Some(cell) = self.dataset.cell(row, col) else {
            return String::new();
        };
        if Some(col) == self.preco_col
            && let Some(price) = parse_price(cell)
        {
            return format_brl(price);
        }
        cell.string_form()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::Dataset;

    fn sample_view() -> TableView {
        let csv = "\
Código,PRODUTO,Preço,PLATAFORMA
1,Mouse sem fio,89.9,Shopee
2,Teclado mecânico,250,Mercado Livre
3,Mousepad gamer,35,Shopee
4,Monitor 24,899.99,Amazon
";
        TableView::new(Dataset::from_csv_bytes(csv.as_bytes()).unwrap())
    }

    #[test]
    fn substring_filter_is_case_insensitive() {
        let mut view = sample_view();
        view.set_filter("PRODUTO", "mouse");
        assert_eq!(view.render(), vec![0, 2]);

        view.set_filter("PRODUTO", "MOUSE");
        assert_eq!(view.render(), vec![0, 2]);
    }

    #[test]
    fn clearing_a_filter_restores_the_full_row_set() {
        let mut view = sample_view();
        view.set_filter("PLATAFORMA", "shopee");
        assert_eq!(view.render(), vec![0, 2]);

        view.set_filter("PLATAFORMA", "");
        assert_eq!(view.render(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn filters_combine_across_columns() {
        let mut view = sample_view();
        view.set_filter("PLATAFORMA", "shopee");
        view.set_filter("PRODUTO", "mousepad");
        assert_eq!(view.render(), vec![2]);
    }

    #[test]
    fn row_order_is_preserved() {
        let mut view = sample_view();
        view.set_filter("Código", "");
        let rendered = view.render();
        let mut sorted = rendered.clone();
        sorted.sort();
        assert_eq!(rendered, sorted);
    }

    #[test]
    fn numeric_cells_filter_on_unformatted_value() {
        let mut view = sample_view();
        // The display form is "R$ 899,99" but the filter sees "899.99".
        view.set_filter("Preço", "899.99");
        assert_eq!(view.render(), vec![3]);

        view.set_filter("Preço", "R$");
        assert!(view.render().is_empty());
    }

    #[test]
    fn designated_columns_offer_distinct_values() {
        let view = sample_view();
        let plataforma = view.dataset().column_index("PLATAFORMA").unwrap();
        let preco = view.dataset().column_index("Preço").unwrap();

        assert!(view.is_selection_column(plataforma));
        assert!(!view.is_selection_column(preco));
        assert_eq!(
            view.selection_values(plataforma),
            ["Amazon", "Mercado Livre", "Shopee"]
        );
    }

    #[test]
    fn price_column_displays_as_brl() {
        let view = sample_view();
        let preco = view.dataset().column_index("Preço").unwrap();
        assert_eq!(view.display_cell(1, preco), "R$ 250,00");
        assert_eq!(view.display_cell(3, preco), "R$ 899,99");
        // Other columns stay raw.
        assert_eq!(view.display_cell(1, 1), "Teclado mecânico");
    }

    #[test]
    fn replace_dataset_resets_filters() {
        let mut view = sample_view();
        view.set_filter("PRODUTO", "mouse");
        assert!(view.has_active_filters());

        view.replace_dataset(Dataset::placeholder());
        assert!(!view.has_active_filters());
        assert_eq!(view.render().len(), 3);
    }
}
