//! Row validation and slug helpers.

use crate::row::{Category, OrderItem, Product};

/// Problems found in one row. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn require(&mut self, ok: bool, message: &str) {
        if !ok {
            self.errors.push(message.to_string());
        }
    }
}

pub fn validate_product(product: &Product) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.require(!product.name.trim().is_empty(), "Product name is required");
    report.require(!product.sku.trim().is_empty(), "Product SKU is required");
    report.require(
        product.price.is_finite() && product.price >= 0.0,
        "Product price must be a positive number",
    );
    report.require(product.category_id != 0, "Product category is required");
    report.require(
        product.stock_quantity.map_or(true, |stock| stock >= 0),
        "Stock quantity cannot be negative",
    );
    report
}

pub fn validate_category(category: &Category) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.require(!category.name.trim().is_empty(), "Category name is required");
    report.require(!category.slug.is_empty(), "Category slug is required");
    report
}

pub fn validate_order_item(item: &OrderItem) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.require(item.order_id != 0, "Order is required");
    report.require(item.product_id != 0, "Product is required");
    report.require(item.quantity > 0, "Quantity must be at least 1");
    report.require(
        item.unit_price.is_finite() && item.unit_price >= 0.0,
        "Unit price must be a positive number",
    );
    report
}

/// URL-safe slug: lowercase ASCII letters and digits joined by single hyphens.
///
/// Whitespace, underscores and hyphens act as separators; every other
/// character is dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut separator = false;
    for c in text.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if separator && !slug.is_empty() {
                slug.push('-');
            }
            separator = false;
            slug.push(c);
        } else if c == '_' || c == '-' || c.is_whitespace() {
            separator = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Power Tools"), "power-tools");
        assert_eq!(slugify("  Garden & Outdoor  "), "garden-outdoor");
        assert_eq!(slugify("snake_case--and  spaces"), "snake-case-and-spaces");
        assert_eq!(slugify("--Leading and trailing--"), "leading-and-trailing");
        assert_eq!(slugify("C++ Books!"), "c-books");
        assert_eq!(slugify("Café"), "caf");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_validate_product() {
        let product = Product {
            id: None,
            created_at: None,
            name: " ".to_string(),
            description: String::new(),
            price: -1.0,
            category_id: 0,
            sku: String::new(),
            stock_quantity: Some(-4),
            is_active: None,
            image_url: None,
            metadata: None,
        };
        let report = validate_product(&product);
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 5);
        assert_eq!(report.errors[0], "Product name is required");
    }

    #[test]
    fn test_validate_order_item() {
        let item = OrderItem {
            id: None,
            created_at: None,
            order_id: 1,
            product_id: 2,
            quantity: 0,
            unit_price: 3.0,
            total_price: 0.0,
            product_name: "Nails".to_string(),
        };
        assert_eq!(
            validate_order_item(&item).errors,
            vec!["Quantity must be at least 1".to_string()]
        );
    }
}
