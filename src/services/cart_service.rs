use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{normalize_phone, AddCartItemRequest, Cart, CartItem, ClientCartItem, SyncCartRequest};
use crate::services::{bargain_service, catalog, group_buy_service};
use crate::store::{Database, Tx};

pub struct CartService {
    db: Arc<dyn Database>,
}

impl CartService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn get(&self, buyer_phone: &str) -> AppResult<Cart> {
        let phone = required_phone(buyer_phone)?;
        let mut tx = self.db.begin().await?;
        Ok(tx
            .cart(&phone)
            .await?
            .unwrap_or_else(|| Cart::empty(&phone, Utc::now())))
    }

    /// Adds a plain line, or overwrites quantity and price of the existing one.
    pub async fn add_item(&self, request: AddCartItemRequest) -> AppResult<Cart> {
        let phone = required_phone(&request.buyer_phone)?;
        let quantity = u32::try_from(request.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| AppError::validation("quantity must be a positive integer"))?;
        catalog::check_positive(request.price, "price")?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let product = tx
            .product(request.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product not found"))?;
        if product.stock < quantity {
            return Err(AppError::rule("Not enough stock available"));
        }
        let location = catalog::seller_location(tx.as_mut(), product.seller_id).await?;

        let mut line = CartItem::snapshot(&product, &location, quantity, request.price);
        line.is_bargain = request.is_bargain;

        let mut cart = tx
            .cart(&phone)
            .await?
            .unwrap_or_else(|| Cart::empty(&phone, now));
        cart.upsert_product(line);
        cart.updated_at = now;
        tx.save_cart(&cart).await?;
        tx.commit().await?;

        tracing::info!(product_id = %product.id, quantity, "Cart item saved");
        Ok(cart)
    }

    pub async fn remove_item(&self, buyer_phone: &str, product_id: Uuid) -> AppResult<Cart> {
        let phone = required_phone(buyer_phone)?;
        let mut tx = self.db.begin().await?;
        let mut cart = tx
            .cart(&phone)
            .await?
            .ok_or_else(|| AppError::not_found("Cart not found"))?;
        let removed = cart.remove_product(product_id);
        cart.updated_at = Utc::now();
        tx.save_cart(&cart).await?;
        tx.commit().await?;

        tracing::debug!(product_id = %product_id, removed, "Cart item removed");
        Ok(cart)
    }

    pub async fn clear(&self, buyer_phone: &str) -> AppResult<()> {
        let phone = required_phone(buyer_phone)?;
        let mut tx = self.db.begin().await?;
        tx.delete_cart(&phone).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Reconciles the client's cart with what the server holds for the buyer.
    ///
    /// Accepted bargains and paid group buys waiting for a cart are reserved
    /// and folded in first, then the stored cart, then the client's lines.
    pub async fn sync(&self, buyer_phone: &str, request: SyncCartRequest) -> AppResult<Cart> {
        let phone = required_phone(buyer_phone)?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let mut server_items = bargain_service::reserve_pending(tx.as_mut(), &phone, now).await?;
        server_items.extend(group_buy_service::reserve_pending(tx.as_mut(), &phone, now).await?);
        let folded = server_items.len();

        let stored_items = tx
            .cart(&phone)
            .await?
            .map(|cart| cart.items)
            .unwrap_or_default();

        let mut client_items = Vec::with_capacity(request.cart_items.len());
        for item in request.cart_items {
            client_items.push(client_line(tx.as_mut(), item).await?);
        }

        let mut cart = Cart::empty(&phone, now);
        cart.merge([server_items, stored_items, client_items]);
        tx.save_cart(&cart).await?;
        tx.commit().await?;

        tracing::info!(folded, lines = cart.items.len(), "Cart synced");
        Ok(cart)
    }
}

fn required_phone(phone: &str) -> AppResult<String> {
    let phone = normalize_phone(phone);
    if phone.is_empty() {
        return Err(AppError::validation("Buyer phone required"));
    }
    Ok(phone)
}

/// Client line with a missing seller location filled from the storefront.
async fn client_line(tx: &mut dyn Tx, item: ClientCartItem) -> AppResult<CartItem> {
    let seller_location = match (item.seller_location.filter(|l| !l.is_empty()), item.seller_id) {
        (Some(location), _) => location,
        (None, Some(seller_id)) => catalog::seller_location(tx, seller_id).await?,
        (None, None) => String::new(),
    };
    Ok(CartItem {
        product_id: item.product_id,
        product_name: item.product_name.unwrap_or_else(|| "Unknown".to_string()),
        seller_id: item.seller_id,
        seller_location,
        quantity: item.quantity,
        price: item.price,
        image_url: item.image_url.unwrap_or_default(),
        is_bargain: item.is_bargain,
        is_group_buy: item.is_group_buy,
        bargain_id: item.bargain_id,
        group_buy_id: item.group_buy_id,
    })
}
