use std::collections::BTreeMap;

use crate::{
    database::{error::ApiError, schema::ShoppingListEntry, store::Store},
    jwt::SessionData,
    permissions::ActionType,
    SHOPPING_LIST_FILENAME, SHOPPING_LIST_HEADER,
};

/// Consolidated ingredient totals across every recipe in a user's cart,
/// one entry per (name, unit) ordered by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingList {
    entries: Vec<ShoppingListEntry>,
}

impl ShoppingList {
    pub fn new(rows: Vec<ShoppingListEntry>) -> Self {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for row in rows {
            *totals
                .entry((row.name, row.measurement_unit))
                .or_insert(0) += row.total_amount;
        }

        let mut entries: Vec<ShoppingListEntry> = totals
            .into_iter()
            .map(|((name, measurement_unit), total_amount)| ShoppingListEntry {
                name,
                measurement_unit,
                total_amount,
            })
            .collect();
        entries.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
        });

        Self { entries }
    }

    pub fn entries(&self) -> &[ShoppingListEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `"{name} ({unit}) - {total}"` per entry, without the header.
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("{} ({}) - {}", e.name, e.measurement_unit, e.total_amount))
            .collect()
    }

    /// Header line followed by one line per entry, each ending in `\n`.
    pub fn render(&self) -> String {
        let mut document = format!("{SHOPPING_LIST_HEADER}\n");
        for line in self.lines() {
            document.push_str(&line);
            document.push('\n');
        }
        document
    }

    pub fn filename(&self) -> &'static str {
        SHOPPING_LIST_FILENAME
    }
}

pub async fn download_shopping_cart<S: Store>(
    store: &S,
    session: &SessionData,
) -> Result<ShoppingList, ApiError> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let rows = store.cart_ingredient_totals(session.user_id).await?;
    log::trace!("> Aggregated {} cart ingredients for {}", rows.len(), session.username);

    Ok(ShoppingList::new(rows))
}
