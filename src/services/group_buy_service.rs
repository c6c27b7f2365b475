use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    normalize_phone, Cart, CartItem, CreateGroupBuyRequest, GroupBuy, GroupBuyError,
    GroupBuyItemView, GroupBuyView, JoinGroupBuyRequest, PayGroupBuyRequest, UpdateGroupBuyRequest,
};
use crate::services::catalog;
use crate::store::{Database, Tx};

const NOT_FOUND: &str = "Group buy not found";

pub struct GroupBuyService {
    db: Arc<dyn Database>,
}

impl GroupBuyService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn create(&self, seller_id: Uuid, request: CreateGroupBuyRequest) -> AppResult<GroupBuyView> {
        request.validate()?;
        catalog::check_positive(request.price_per_unit, "pricePerUnit")?;

        let mut tx = self.db.begin().await?;
        let product = tx
            .product(request.product_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product not found: {}", request.product_id)))?;
        if product.seller_id != seller_id {
            return Err(AppError::forbidden("Product does not belong to this seller"));
        }

        let group = GroupBuy::new(seller_id, request, Utc::now());
        tx.save_group_buy(&group).await?;
        tx.commit().await?;

        tracing::info!(group_buy_id = %group.id, seller_id = %seller_id, "Group buy created");
        Ok(GroupBuyView::new(&group, Some(&product)))
    }

    /// Visible group buys still before their deadline, soonest first.
    pub async fn public(&self, seller_id: Option<Uuid>) -> AppResult<Vec<GroupBuyView>> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let mut groups: Vec<GroupBuy> = match seller_id {
            Some(seller_id) => tx.group_buys_by_seller(seller_id).await?,
            None => tx.group_buys().await?,
        };
        groups.retain(|group| group.is_listed(now));
        groups.sort_by_key(|group| group.deadline);
        views(tx.as_mut(), &groups).await
    }

    pub async fn for_seller(&self, seller_id: Uuid) -> AppResult<Vec<GroupBuyView>> {
        let mut tx = self.db.begin().await?;
        let mut groups = tx.group_buys_by_seller(seller_id).await?;
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        views(tx.as_mut(), &groups).await
    }

    pub async fn join(&self, group_id: Uuid, request: JoinGroupBuyRequest) -> AppResult<GroupBuyView> {
        let phone = required_phone(&request.phone)?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let mut group = load(tx.as_mut(), group_id).await?;
        let was_full = group.is_full();
        group.join(&request.name, &phone, request.quantity, now)?;
        tx.save_group_buy(&group).await?;
        let product = tx.product(group.product_id).await?;
        tx.commit().await?;

        tracing::info!(
            group_buy_id = %group.id,
            quantity = request.quantity,
            joined = group.joined_quantity(),
            "Group buy joined"
        );
        if !was_full && group.is_full() {
            tracing::info!(group_buy_id = %group.id, "Group buy is full");
        }
        Ok(GroupBuyView::new(&group, product.as_ref()))
    }

    pub async fn pay(&self, group_id: Uuid, request: PayGroupBuyRequest) -> AppResult<()> {
        let phone = required_phone(&request.phone)?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let mut group = load(tx.as_mut(), group_id).await?;
        let quantity = group.pay(&phone, request.quantity, now)?.quantity;
        tx.save_group_buy(&group).await?;
        tx.commit().await?;

        tracing::info!(group_buy_id = %group.id, quantity, "Group buy payment recorded");
        Ok(())
    }

    /// Moves a paid participation into the participant's cart.
    pub async fn add_to_cart(&self, group_id: Uuid, phone: &str) -> AppResult<Cart> {
        let phone = required_phone(phone)?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let mut group = load(tx.as_mut(), group_id).await?;
        let mut cart = tx
            .cart(&phone)
            .await?
            .unwrap_or_else(|| Cart::empty(&phone, now));
        if cart.contains_group_buy(group.id) {
            return Err(GroupBuyError::AlreadyInCart.into());
        }

        let line = reserve_line(tx.as_mut(), &mut group, &phone, now).await?;
        cart.upsert(line);
        cart.updated_at = now;

        tx.save_group_buy(&group).await?;
        tx.save_cart(&cart).await?;
        tx.commit().await?;

        tracing::info!(group_buy_id = %group.id, "Group buy added to cart");
        Ok(cart)
    }

    pub async fn update(
        &self,
        seller_id: Uuid,
        group_id: Uuid,
        request: UpdateGroupBuyRequest,
    ) -> AppResult<GroupBuyView> {
        request.validate()?;
        if let Some(price) = request.price_per_unit {
            catalog::check_positive(price, "pricePerUnit")?;
        }

        let mut tx = self.db.begin().await?;
        let mut group = owned(tx.as_mut(), seller_id, group_id).await?;
        group.update_terms(request, Utc::now())?;
        tx.save_group_buy(&group).await?;
        let product = tx.product(group.product_id).await?;
        tx.commit().await?;

        tracing::info!(group_buy_id = %group.id, "Group buy updated");
        Ok(GroupBuyView::new(&group, product.as_ref()))
    }

    pub async fn delete(&self, seller_id: Uuid, group_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        owned(tx.as_mut(), seller_id, group_id).await?;
        tx.delete_group_buy(group_id).await?;
        tx.commit().await?;
        tracing::info!(group_buy_id = %group_id, "Group buy deleted");
        Ok(())
    }

    pub async fn set_visibility(&self, seller_id: Uuid, group_id: Uuid, visible: bool) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let mut group = owned(tx.as_mut(), seller_id, group_id).await?;
        group.set_visible(visible, Utc::now());
        tx.save_group_buy(&group).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn mark_ready(&self, seller_id: Uuid, group_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let mut group = owned(tx.as_mut(), seller_id, group_id).await?;
        group.mark_ready(Utc::now());
        tx.save_group_buy(&group).await?;
        tx.commit().await?;
        tracing::info!(group_buy_id = %group_id, "Group buy marked ready");
        Ok(())
    }

    /// Paid participations not yet in a cart, as priced items.
    pub async fn successful_items(&self, buyer_phone: &str) -> AppResult<Vec<GroupBuyItemView>> {
        let phone = normalize_phone(buyer_phone);
        let mut tx = self.db.begin().await?;
        let mut items = Vec::new();
        for group in tx.group_buys_by_paid_phone(&phone).await? {
            let Some(paid) = group.pending_pickup(&phone) else {
                continue;
            };
            let Some(product) = tx.product(group.product_id).await? else {
                continue;
            };
            items.push(GroupBuyItemView {
                group_buy_id: group.id,
                product_id: product.id,
                seller_id: group.seller_id,
                product_name: product.name.clone(),
                price: group.price_per_unit,
                quantity: paid.quantity,
                image_url: product.image_url(),
            });
        }
        Ok(items)
    }
}

fn required_phone(phone: &str) -> AppResult<String> {
    let phone = normalize_phone(phone);
    if phone.is_empty() {
        return Err(AppError::validation("phone is required"));
    }
    Ok(phone)
}

async fn load(tx: &mut dyn Tx, group_id: Uuid) -> AppResult<GroupBuy> {
    tx.group_buy(group_id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

async fn owned(tx: &mut dyn Tx, seller_id: Uuid, group_id: Uuid) -> AppResult<GroupBuy> {
    let group = load(tx, group_id).await?;
    if group.seller_id != seller_id {
        return Err(AppError::forbidden("Not authorized to manage this group buy"));
    }
    Ok(group)
}

async fn views(tx: &mut dyn Tx, groups: &[GroupBuy]) -> AppResult<Vec<GroupBuyView>> {
    let ids: Vec<Uuid> = groups.iter().map(|group| group.product_id).collect();
    let catalog = catalog::load_catalog(tx, &ids).await?;
    Ok(groups
        .iter()
        .map(|group| GroupBuyView::new(group, catalog.get(&group.product_id)))
        .collect())
}

/// Reserves the paid seat and prices it as one cart line.
async fn reserve_line(
    tx: &mut dyn Tx,
    group: &mut GroupBuy,
    phone: &str,
    now: DateTime<Utc>,
) -> AppResult<CartItem> {
    let quantity = group.reserve_for_cart(phone, now)?;
    let product = tx
        .product(group.product_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product not found: {}", group.product_id)))?;
    let location = catalog::seller_location(tx, group.seller_id).await?;
    Ok(CartItem::snapshot(&product, &location, quantity, group.price_per_unit).from_group_buy(group.id))
}

/// Every paid participation of the buyer still waiting for a cart, reserved
/// and priced. Used by cart sync.
pub(crate) async fn reserve_pending(
    tx: &mut dyn Tx,
    buyer_phone: &str,
    now: DateTime<Utc>,
) -> AppResult<Vec<CartItem>> {
    let mut lines = Vec::new();
    for mut group in tx.group_buys_by_paid_phone(buyer_phone).await? {
        if group.pending_pickup(buyer_phone).is_none() {
            continue;
        }
        lines.push(reserve_line(tx, &mut group, buyer_phone, now).await?);
        tx.save_group_buy(&group).await?;
        tracing::debug!(group_buy_id = %group.id, "Group buy folded into cart sync");
    }
    Ok(lines)
}
