//! Order placement and order reads.
//!
//! Placement runs in a single transaction. It gathers bargains and group-buy
//! seats the buyer has reserved into a cart, adds the explicit product lines,
//! re-checks stock for every line, decrements it, writes the order, clears the
//! cart and consumes the sources. Any failure drops the transaction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    generate_order_id, normalize_phone, Bargain, BargainStatus, GroupBuy, LineSource, Order,
    OrderLine, OrderProductRequest, PlaceFromCartRequest, PlaceOrderRequest, PreviewLine, Product,
    UpdateOrderStatusRequest,
};
use crate::services::catalog;
use crate::services::tracking_service::refresh_seller_scores;
use crate::services::Staff;
use crate::store::{Database, Tx};

/// Line waiting to be priced against the catalog.
#[derive(Debug, Clone)]
struct PendingLine {
    product_id: Uuid,
    quantity: u32,
    /// Negotiated or snapshotted price; catalog price when absent.
    price: Option<f64>,
    seller_id: Option<Uuid>,
    source: LineSource,
    bargain_id: Option<Uuid>,
    group_buy_id: Option<Uuid>,
}

impl PendingLine {
    fn priced(&self, product: &Product) -> OrderLine {
        OrderLine {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: self.quantity,
            price: self.price.unwrap_or(product.price),
            seller_id: self.seller_id.unwrap_or(product.seller_id),
            is_bargain: self.source == LineSource::Bargain,
            is_group_buy: self.source == LineSource::GroupBuy,
            bargain_id: self.bargain_id,
            group_buy_id: self.group_buy_id,
        }
    }
}

/// Reserved sources of one buyer plus the lines they contribute.
struct ReservedSources {
    bargains: Vec<Bargain>,
    group_buys: Vec<GroupBuy>,
    lines: Vec<PendingLine>,
}

pub struct OrderService {
    db: Arc<dyn Database>,
}

impl OrderService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Places an order from reserved sources and the given product list.
    pub async fn place(&self, request: PlaceOrderRequest) -> AppResult<Order> {
        request.validate()?;
        let phone = normalize_phone(&request.buyer_phone);
        let explicit = explicit_lines(&request.products)?;

        let mut tx = self.db.begin().await?;
        let order = place_in(
            tx.as_mut(),
            &request.buyer_name,
            &phone,
            &request.location,
            explicit,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.order_id,
            lines = order.products.len(),
            "Order placed"
        );
        Ok(order)
    }

    /// Places an order from the buyer's stored cart and reserved sources.
    pub async fn place_from_cart(&self, buyer_phone: &str, request: PlaceFromCartRequest) -> AppResult<Order> {
        request.validate()?;
        let phone = normalize_phone(buyer_phone);

        let mut tx = self.db.begin().await?;
        let explicit = stored_cart_lines(tx.as_mut(), &phone).await?;
        let order = place_in(tx.as_mut(), &request.buyer_name, &phone, &request.location, explicit).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.order_id,
            lines = order.products.len(),
            "Order placed from cart"
        );
        Ok(order)
    }

    /// Lines an order from the stored cart would contain. Nothing is written.
    pub async fn preview(&self, buyer_phone: &str) -> AppResult<Vec<PreviewLine>> {
        let phone = normalize_phone(buyer_phone);
        let mut tx = self.db.begin().await?;

        let mut pending = reserved_sources(tx.as_mut(), &phone).await?.lines;
        pending.extend(stored_cart_lines(tx.as_mut(), &phone).await?);

        let mut preview = Vec::with_capacity(pending.len());
        for line in pending {
            let Some(product) = tx.product(line.product_id).await? else {
                continue;
            };
            preview.push(PreviewLine {
                line: line.priced(&product),
                source: line.source,
            });
        }
        Ok(preview)
    }

    pub async fn buyer_orders(&self, buyer_phone: &str) -> AppResult<Vec<Order>> {
        let phone = normalize_phone(buyer_phone);
        let mut tx = self.db.begin().await?;
        let mut orders = tx.orders_by_buyer(&phone).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Orders containing the seller's products, reduced to the seller's lines.
    pub async fn seller_orders(&self, seller_id: Uuid) -> AppResult<Vec<Order>> {
        let mut tx = self.db.begin().await?;
        let mut orders = tx.orders_by_seller(seller_id).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders.iter().map(|order| order.for_seller(seller_id)).collect())
    }

    pub async fn all_orders(&self) -> AppResult<Vec<Order>> {
        let mut tx = self.db.begin().await?;
        let mut orders = tx.orders().await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    pub async fn update_status(
        &self,
        staff: Staff,
        order_id: &str,
        request: UpdateOrderStatusRequest,
    ) -> AppResult<Order> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let mut order = tx
            .order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order not found"))?;
        staff.authorize(&order)?;

        if let Some(delivery) = request.delivery_status {
            order.delivery_status = delivery;
        }
        if let Some(payment) = request.payment_status {
            order.payment_status = payment;
        }
        let rated = request.satisfaction_status.is_some();
        if let Some(satisfaction) = request.satisfaction_status {
            order.satisfaction_status = satisfaction;
        }
        order.updated_at = now;
        tx.save_order(&order).await?;
        if rated || request.payment_status.is_some() {
            refresh_seller_scores(tx.as_mut(), &order.seller_ids(), now).await?;
        }
        tx.commit().await?;

        tracing::info!(order_id = %order.order_id, "Order status updated");
        Ok(order)
    }
}

fn explicit_lines(products: &[OrderProductRequest]) -> AppResult<Vec<PendingLine>> {
    let mut lines = Vec::with_capacity(products.len());
    for product in products {
        // Negotiated and pooled lines come from their reserved sources.
        if product.bargain_id.is_some() || product.group_buy_id.is_some() {
            continue;
        }
        let quantity = u32::try_from(product.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| AppError::validation("Each product must have productId and positive quantity"))?;
        if let Some(price) = product.price {
            catalog::check_positive(price, "price")?;
        }
        lines.push(PendingLine {
            product_id: product.product_id,
            quantity,
            price: product.price,
            seller_id: None,
            source: LineSource::Cart,
            bargain_id: None,
            group_buy_id: None,
        });
    }
    Ok(lines)
}

async fn stored_cart_lines(tx: &mut dyn Tx, phone: &str) -> AppResult<Vec<PendingLine>> {
    let items = tx.cart(phone).await?.map(|cart| cart.items).unwrap_or_default();
    Ok(items
        .into_iter()
        .filter(|item| item.is_plain() && item.quantity > 0)
        .map(|item| PendingLine {
            product_id: item.product_id,
            quantity: item.quantity,
            price: Some(item.price),
            seller_id: None,
            source: LineSource::Cart,
            bargain_id: None,
            group_buy_id: None,
        })
        .collect())
}

/// Accepted bargains and paid group-buy seats the buyer has put in a cart
/// but not yet ordered.
async fn reserved_sources(tx: &mut dyn Tx, phone: &str) -> AppResult<ReservedSources> {
    let mut sources = ReservedSources {
        bargains: Vec::new(),
        group_buys: Vec::new(),
        lines: Vec::new(),
    };

    for bargain in tx.bargains_by_buyer(phone).await? {
        if bargain.status != BargainStatus::Accepted || !bargain.lifecycle.is_reserved() {
            continue;
        }
        let Some(terms) = bargain.final_terms() else {
            continue;
        };
        let unit_price = terms.unit_price();
        sources.lines.extend(terms.items.iter().map(|item| PendingLine {
            product_id: item.product_id,
            quantity: item.quantity,
            price: Some(unit_price),
            seller_id: Some(bargain.seller_id),
            source: LineSource::Bargain,
            bargain_id: Some(bargain.id),
            group_buy_id: None,
        }));
        sources.bargains.push(bargain);
    }

    for group in tx.group_buys_by_paid_phone(phone).await? {
        let Some(paid) = group.paid(phone).filter(|p| p.lifecycle.is_reserved()) else {
            continue;
        };
        sources.lines.push(PendingLine {
            product_id: group.product_id,
            quantity: paid.quantity,
            price: Some(group.price_per_unit),
            seller_id: Some(group.seller_id),
            source: LineSource::GroupBuy,
            bargain_id: None,
            group_buy_id: Some(group.id),
        });
        sources.group_buys.push(group);
    }

    Ok(sources)
}

async fn place_in(
    tx: &mut dyn Tx,
    buyer_name: &str,
    phone: &str,
    location: &str,
    explicit: Vec<PendingLine>,
) -> AppResult<Order> {
    let now = Utc::now();
    let ReservedSources {
        mut bargains,
        mut group_buys,
        mut lines,
    } = reserved_sources(tx, phone).await?;
    lines.extend(explicit);

    if lines.is_empty() {
        return Err(AppError::rule("No products to order."));
    }

    let mut stock: HashMap<Uuid, Product> = HashMap::new();
    let mut order_lines = Vec::with_capacity(lines.len());
    for line in &lines {
        if !stock.contains_key(&line.product_id) {
            let product = tx
                .product(line.product_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Product {} not found.", line.product_id)))?;
            stock.insert(line.product_id, product);
        }
        let Some(product) = stock.get_mut(&line.product_id) else {
            continue;
        };
        if !product.take_stock(line.quantity) {
            tracing::warn!(product_id = %product.id, requested = line.quantity, "Order rejected for stock");
            return Err(AppError::rule(format!("Not enough stock for product {}", product.name)));
        }
        order_lines.push(line.priced(product));
    }

    for product in stock.values() {
        tx.save_product(product).await?;
    }

    let order_id = unused_order_id(tx, now).await?;
    let order = Order::placed(order_id, buyer_name, phone, location, order_lines, now);
    tx.save_order(&order).await?;
    tx.delete_cart(phone).await?;

    for bargain in &mut bargains {
        bargain.complete(&order.order_id, now)?;
        tx.save_bargain(bargain).await?;
    }
    for group in &mut group_buys {
        group.consume(phone, &order.order_id, now)?;
        tx.save_group_buy(group).await?;
    }

    Ok(order)
}

async fn unused_order_id(tx: &mut dyn Tx, now: DateTime<Utc>) -> AppResult<String> {
    for _ in 0..5 {
        let candidate = generate_order_id(now);
        if tx.order(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!("Could not allocate a unique order id")))
}
