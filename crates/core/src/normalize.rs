//! Header normalization for heterogeneous tabular exports.
//!
//! Input files carry no schema contract: the same logical field arrives
//! under dozens of spellings (`Item Name`, `stock_item_name`,
//! `Particulars`, …) and unit-of-measure noise (`PCS`, `Nos`) shows up in
//! columns that look like identifiers. Header matching here is data-driven:
//! ordered synonym lists per logical field, consulted by one generic lookup
//! keyed on a canonicalized header form.

use serde_json::{Map, Value as Json};

// ---------------------------------------------------------------------------
// Canonical keys & unit tokens
// ---------------------------------------------------------------------------

/// Unit-of-measure tokens that must never be mistaken for identifiers.
pub const UNIT_TOKENS: &[&str] = &[
    "pcs", "pc", "nos", "no", "kg", "kgs", "gm", "gms", "g", "ltr", "ltrs", "l", "ml", "box",
    "boxes", "pkt", "pkts", "set", "sets", "pair", "pairs", "dozen", "doz", "mtr", "mtrs", "m",
    "cm", "ft", "unit", "units", "bag", "bags", "btl", "roll",
];

/// Canonical form used for header and lookup matching: lowercase with all
/// non-alphanumerics stripped (`"Item Name"` and `item_name` collide).
pub fn canonical_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Whether a value is a known unit-of-measure token.
pub fn is_unit_token(value: &str) -> bool {
    let canon = canonical_key(value);
    UNIT_TOKENS.contains(&canon.as_str())
}

/// Return the first candidate that is non-empty and not a unit token.
pub fn pick_first_meaningful(candidates: &[Option<String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|c| c.trim())
        .find(|c| !c.is_empty() && !is_unit_token(c))
        .map(str::to_string)
}

/// Deterministic placeholder name for a row that carried no usable
/// identifier (1-based, so operators can find the row in their file).
pub fn fallback_name(prefix: &str, row_index: usize) -> String {
    format!("{prefix}-{}", row_index + 1)
}

// ---------------------------------------------------------------------------
// RawRow
// ---------------------------------------------------------------------------

/// One untyped input record. Keys are arbitrary source headers; values are
/// whatever the export supplied (strings, numbers, booleans). Ephemeral:
/// discarded as soon as a canonical row has been built from it.
#[derive(Debug, Clone, Default)]
pub struct RawRow(Map<String, Json>);

impl RawRow {
    pub fn new(fields: Map<String, Json>) -> Self {
        Self(fields)
    }

    /// Build from any JSON value; only objects qualify.
    pub fn from_json(value: Json) -> Option<Self> {
        match value {
            Json::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First non-null value whose canonicalized header matches a synonym,
    /// scanning synonyms in priority order.
    pub fn value(&self, synonyms: &[&str]) -> Option<&Json> {
        for synonym in synonyms {
            let target = canonical_key(synonym);
            for (key, value) in &self.0 {
                if !value.is_null() && canonical_key(key) == target {
                    return Some(value);
                }
            }
        }
        None
    }

    /// [`Self::value`] rendered as trimmed text; `None` when missing or blank.
    pub fn text(&self, synonyms: &[&str]) -> Option<String> {
        self.value(synonyms).and_then(|v| match v {
            Json::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Json::Number(n) => Some(n.to_string()),
            Json::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    /// [`Self::value`] cloned for the coercion engine; `Null` when absent.
    pub fn raw(&self, synonyms: &[&str]) -> Json {
        self.value(synonyms).cloned().unwrap_or(Json::Null)
    }
}

// ---------------------------------------------------------------------------
// Synonym tables
// ---------------------------------------------------------------------------

/// Ordered header synonym lists per logical field.
///
/// Order matters: earlier spellings win when a file carries several
/// matching columns. Extend these tables rather than adding lookup code.
pub mod synonyms {
    pub mod inventory {
        pub const NAME: &[&str] = &[
            "name",
            "item_name",
            "product_name",
            "item",
            "product",
            "stock_item_name",
            "stock_item",
            "particulars",
            "description",
        ];
        pub const SKU: &[&str] = &["sku", "code", "item_code", "product_code", "barcode"];
        pub const CATEGORY: &[&str] = &["category", "item_group", "group", "type"];
        pub const UNIT: &[&str] = &["unit", "uom", "units", "unit_of_measure"];
        pub const QUANTITY: &[&str] = &[
            "quantity",
            "qty",
            "stock",
            "closing_stock",
            "opening_stock",
            "stock_qty",
            "closing_balance",
        ];
        pub const PURCHASE_PRICE: &[&str] = &[
            "purchase_price",
            "cost_price",
            "cost",
            "buy_price",
            "purchase_rate",
        ];
        pub const SELLING_PRICE: &[&str] = &[
            "selling_price",
            "sale_price",
            "price",
            "rate",
            "mrp",
            "standard_rate",
        ];
        pub const TAX_RATE: &[&str] = &["tax_rate", "gst_rate", "gst", "tax", "vat"];
    }

    /// Shared by customers and suppliers.
    pub mod contact {
        pub const NAME: &[&str] = &[
            "name",
            "customer_name",
            "supplier_name",
            "party_name",
            "contact_name",
            "company",
            "ledger_name",
        ];
        pub const PHONE: &[&str] = &[
            "phone",
            "mobile",
            "phone_number",
            "mobile_number",
            "contact_number",
            "contact",
            "whatsapp",
        ];
        pub const EMAIL: &[&str] = &["email", "email_address", "mail"];
        pub const ADDRESS: &[&str] = &[
            "address",
            "billing_address",
            "address_line_1",
            "street",
            "location",
        ];
    }

    pub mod sale {
        pub const PRODUCT_ID: &[&str] = &["product_id", "item_id"];
        pub const PRODUCT: &[&str] = &[
            "product",
            "item",
            "item_name",
            "product_name",
            "stock_item",
            "particulars",
            "description",
        ];
        pub const CUSTOMER: &[&str] =
            &["customer", "customer_name", "party", "party_name", "buyer"];
        pub const QUANTITY: &[&str] = &["quantity", "qty", "units_sold"];
        pub const UNIT_PRICE: &[&str] =
            &["unit_price", "rate", "price", "price_per_unit", "selling_price"];
        pub const TOTAL: &[&str] = &[
            "total",
            "amount",
            "total_amount",
            "gross_total",
            "net_amount",
            "grand_total",
            "value",
        ];
        pub const TAX_AMOUNT: &[&str] =
            &["tax_amount", "gst_amount", "vat_amount", "tax", "gst"];
        pub const PAYMENT_METHOD: &[&str] = &[
            "payment_method",
            "payment_mode",
            "payment_type",
            "mode",
            "paid_by",
        ];
        pub const DATE: &[&str] = &[
            "date",
            "sale_date",
            "invoice_date",
            "voucher_date",
            "bill_date",
            "txn_date",
        ];
        pub const TIME: &[&str] = &["time", "sale_time", "invoice_time", "txn_time"];
        pub const REFERENCE: &[&str] = &[
            "invoice_no",
            "invoice_number",
            "voucher_no",
            "bill_no",
            "receipt_no",
            "reference",
            "ref_no",
        ];
    }

    pub mod expense {
        pub const CATEGORY: &[&str] =
            &["category", "expense_category", "head", "account", "ledger"];
        pub const DESCRIPTION: &[&str] =
            &["description", "particulars", "narration", "details", "notes"];
        pub const AMOUNT: &[&str] = &["amount", "total", "value", "debit", "expense_amount"];
        pub const SUPPLIER: &[&str] = &["supplier", "vendor", "party", "party_name", "paid_to"];
        pub const PAYMENT_METHOD: &[&str] =
            &["payment_method", "payment_mode", "mode", "paid_by"];
        pub const DATE: &[&str] = &[
            "date",
            "expense_date",
            "voucher_date",
            "bill_date",
            "txn_date",
        ];
        pub const REFERENCE: &[&str] = &["voucher_no", "bill_no", "receipt_no", "reference", "ref_no"];
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Json) -> RawRow {
        RawRow::from_json(value).unwrap()
    }

    // -- canonical_key --------------------------------------------------------

    #[test]
    fn canonical_key_strips_and_lowercases() {
        assert_eq!(canonical_key("Item Name"), "itemname");
        assert_eq!(canonical_key("item_name"), "itemname");
        assert_eq!(canonical_key("ITEM-NAME!"), "itemname");
    }

    #[test]
    fn canonical_key_of_symbols_is_empty() {
        assert_eq!(canonical_key("---"), "");
    }

    // -- unit tokens ----------------------------------------------------------

    #[test]
    fn unit_tokens_detected_case_insensitively() {
        assert!(is_unit_token("PCS"));
        assert!(is_unit_token("Nos."));
        assert!(is_unit_token("kg"));
        assert!(!is_unit_token("Sugar 1kg Pack"));
    }

    #[test]
    fn pick_first_meaningful_skips_unit_tokens() {
        let picked = pick_first_meaningful(&[
            Some("PCS".to_string()),
            Some("Basmati Rice".to_string()),
        ]);
        assert_eq!(picked.as_deref(), Some("Basmati Rice"));
    }

    #[test]
    fn pick_first_meaningful_skips_blanks() {
        let picked = pick_first_meaningful(&[
            None,
            Some("  ".to_string()),
            Some("Steel Bolt".to_string()),
        ]);
        assert_eq!(picked.as_deref(), Some("Steel Bolt"));
    }

    #[test]
    fn pick_first_meaningful_all_units_is_none() {
        assert_eq!(
            pick_first_meaningful(&[Some("PCS".to_string()), Some("nos".to_string())]),
            None
        );
    }

    #[test]
    fn fallback_name_is_one_based() {
        assert_eq!(fallback_name("item", 0), "item-1");
        assert_eq!(fallback_name("customer", 9), "customer-10");
    }

    // -- RawRow ---------------------------------------------------------------

    #[test]
    fn value_matches_headers_across_spellings() {
        let r = row(json!({ "Item Name": "Soap", "Qty": 4 }));
        assert_eq!(
            r.text(synonyms::inventory::NAME).as_deref(),
            Some("Soap")
        );
        assert_eq!(r.text(synonyms::inventory::QUANTITY).as_deref(), Some("4"));
    }

    #[test]
    fn synonym_priority_order_wins() {
        // "name" outranks "description" regardless of map ordering.
        let r = row(json!({ "description": "long text", "NAME": "Short" }));
        assert_eq!(
            r.text(synonyms::inventory::NAME).as_deref(),
            Some("Short")
        );
    }

    #[test]
    fn null_cells_are_skipped() {
        let r = row(json!({ "name": null, "item_name": "Fallback" }));
        assert_eq!(
            r.text(synonyms::inventory::NAME).as_deref(),
            Some("Fallback")
        );
    }

    #[test]
    fn text_trims_and_drops_blank() {
        let r = row(json!({ "phone": "  98765  " }));
        assert_eq!(r.text(synonyms::contact::PHONE).as_deref(), Some("98765"));
        let blank = row(json!({ "phone": "   " }));
        assert_eq!(blank.text(synonyms::contact::PHONE), None);
    }

    #[test]
    fn raw_returns_null_when_absent() {
        let r = row(json!({ "qty": 2 }));
        assert_eq!(r.raw(synonyms::sale::TOTAL), Json::Null);
        assert_eq!(r.raw(synonyms::sale::QUANTITY), json!(2));
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(RawRow::from_json(json!(["not", "an", "object"])).is_none());
    }
}
