//! Catalog lookups and offer validation shared by negotiation and carts

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{OfferItem, OfferItemRequest, Product};
use crate::store::{StoreResult, Tx};

/// Opening offer versus a counter inside a running negotiation; they differ
/// only in how a price above the catalog ceiling is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferKind {
    Opening,
    Counter,
}

#[derive(Debug, Error, PartialEq)]
pub enum OfferRejection {
    #[error("Items array is required and cannot be empty")]
    EmptyItems,
    #[error("Each item must have productId and positive quantity")]
    InvalidItem,
    #[error("Product {0} is listed more than once")]
    DuplicateProduct(Uuid),
    #[error("{0} must be a positive number")]
    NonPositiveTotal(&'static str),
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),
    #[error("Product '{0}' is not bargainable")]
    NotBargainable(String),
    #[error("Insufficient stock for '{0}'")]
    InsufficientStock(String),
    #[error("All items must belong to the same seller")]
    MixedSellers,
    #[error("Product '{0}' does not belong to this seller")]
    WrongSeller(String),
    #[error("totalOfferedPrice cannot exceed combined price of products ({0})")]
    AboveCatalogPrice(f64),
    #[error("Counter price exceeds maximum value")]
    CounterAboveMaximum,
}

/// Items of an offer that passed every catalog rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOffer {
    pub items: Vec<OfferItem>,
    pub seller_id: Uuid,
    /// Sum of catalog price x quantity at submission time.
    pub ceiling: f64,
}

pub fn parse_items(items: &[OfferItemRequest]) -> Result<Vec<(Uuid, u32)>, OfferRejection> {
    if items.is_empty() {
        return Err(OfferRejection::EmptyItems);
    }
    let mut parsed: Vec<(Uuid, u32)> = Vec::with_capacity(items.len());
    for item in items {
        let quantity = u32::try_from(item.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(OfferRejection::InvalidItem)?;
        if parsed.iter().any(|(id, _)| *id == item.product_id) {
            return Err(OfferRejection::DuplicateProduct(item.product_id));
        }
        parsed.push((item.product_id, quantity));
    }
    Ok(parsed)
}

pub fn check_positive(total: f64, field: &'static str) -> Result<(), OfferRejection> {
    if !total.is_finite() || total <= 0.0 {
        return Err(OfferRejection::NonPositiveTotal(field));
    }
    Ok(())
}

pub async fn load_catalog(
    tx: &mut dyn Tx,
    ids: &[Uuid],
) -> StoreResult<HashMap<Uuid, Product>> {
    let mut catalog = HashMap::new();
    for &id in ids {
        if catalog.contains_key(&id) {
            continue;
        }
        if let Some(product) = tx.product(id).await? {
            catalog.insert(id, product);
        }
    }
    Ok(catalog)
}

/// Applies the catalog rules in order and reports the first one violated.
pub fn check_against_catalog(
    kind: OfferKind,
    items: &[(Uuid, u32)],
    total: f64,
    catalog: &HashMap<Uuid, Product>,
    expected_seller: Option<Uuid>,
) -> Result<ValidatedOffer, OfferRejection> {
    let mut seller_id = expected_seller;
    let mut ceiling = 0.0;
    let mut validated = Vec::with_capacity(items.len());

    for &(product_id, quantity) in items {
        let product = catalog
            .get(&product_id)
            .ok_or(OfferRejection::ProductNotFound(product_id))?;
        if !product.is_bargainable {
            return Err(OfferRejection::NotBargainable(product.name.clone()));
        }
        if quantity > product.stock {
            return Err(OfferRejection::InsufficientStock(product.name.clone()));
        }
        match seller_id {
            None => seller_id = Some(product.seller_id),
            Some(seller) if seller != product.seller_id => {
                return Err(match expected_seller {
                    Some(_) => OfferRejection::WrongSeller(product.name.clone()),
                    None => OfferRejection::MixedSellers,
                });
            }
            Some(_) => {}
        }

        ceiling += product.price * f64::from(quantity);
        validated.push(OfferItem {
            product_id,
            product_name: Some(product.name.clone()),
            quantity,
        });
    }

    if total > ceiling {
        return Err(match kind {
            OfferKind::Opening => OfferRejection::AboveCatalogPrice(ceiling),
            OfferKind::Counter => OfferRejection::CounterAboveMaximum,
        });
    }

    let seller_id = seller_id.ok_or(OfferRejection::EmptyItems)?;
    Ok(ValidatedOffer {
        items: validated,
        seller_id,
        ceiling,
    })
}

/// Full offer validation: shape, price, then catalog rules.
pub async fn validate_offer(
    tx: &mut dyn Tx,
    kind: OfferKind,
    items: &[OfferItemRequest],
    total: f64,
    price_field: &'static str,
    expected_seller: Option<Uuid>,
) -> Result<ValidatedOffer, AppError> {
    let parsed = parse_items(items)?;
    check_positive(total, price_field)?;
    let ids: Vec<Uuid> = parsed.iter().map(|(id, _)| *id).collect();
    let catalog = load_catalog(tx, &ids).await?;
    Ok(check_against_catalog(kind, &parsed, total, &catalog, expected_seller)?)
}

/// Seller's storefront location, empty when the seller has no storefront.
pub async fn seller_location(tx: &mut dyn Tx, seller_id: Uuid) -> StoreResult<String> {
    Ok(tx
        .storefront(seller_id)
        .await?
        .map(|store| store.location)
        .unwrap_or_default())
}
