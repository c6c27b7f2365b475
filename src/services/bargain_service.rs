//! Bargain negotiation service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    normalize_phone, Bargain, BargainItemView, BargainView, BuyerBargainView, Cart, CartItem,
    FinalTerms, NegotiationError, Offer, Party, RespondOutcome, RespondRequest, ResponseAction,
    StartBargainRequest,
};
use crate::services::catalog::{self, OfferKind};
use crate::store::{Database, Tx};

const NOT_FOUND: &str = "Bargain not found";
const NOT_FOUND_FOR_BUYER: &str = "Bargain not found or unauthorized";

/// Who is responding, and the identity they must match on the bargain.
enum Responder {
    Seller(Uuid),
    Buyer(String),
}

impl Responder {
    fn party(&self) -> Party {
        match self {
            Self::Seller(_) => Party::Seller,
            Self::Buyer(_) => Party::Buyer,
        }
    }

    fn authorize(&self, bargain: &Bargain) -> AppResult<()> {
        match self {
            Self::Seller(seller_id) if bargain.seller_id != *seller_id => Err(
                AppError::forbidden("Not authorized to respond to this bargain"),
            ),
            Self::Buyer(phone) if !bargain.belongs_to_buyer(phone) => {
                Err(AppError::not_found(NOT_FOUND_FOR_BUYER))
            }
            _ => Ok(()),
        }
    }
}

pub struct BargainService {
    db: Arc<dyn Database>,
}

impl BargainService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Opens a negotiation with the buyer's first offer.
    pub async fn start(&self, request: StartBargainRequest) -> AppResult<BargainView> {
        request.validate()?;
        let phone = normalize_phone(&request.buyer_phone);
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let offer = catalog::validate_offer(
            tx.as_mut(),
            OfferKind::Opening,
            &request.items,
            request.total_offered_price,
            "totalOfferedPrice",
            None,
        )
        .await?;

        let opening = Offer {
            items: offer.items,
            total_price: request.total_offered_price,
            note: non_empty(&request.note),
            time: now,
        };
        let bargain = Bargain::open(
            &request.buyer_name,
            &phone,
            &request.note,
            offer.seller_id,
            opening,
            now,
        );
        tx.save_bargain(&bargain).await?;
        tx.commit().await?;

        tracing::info!(
            bargain_id = %bargain.id,
            seller_id = %bargain.seller_id,
            offered = request.total_offered_price,
            ceiling = offer.ceiling,
            "Bargain started"
        );
        Ok(BargainView::from(&bargain))
    }

    pub async fn respond_as_seller(
        &self,
        seller_id: Uuid,
        request: RespondRequest,
    ) -> AppResult<RespondOutcome> {
        self.respond(Responder::Seller(seller_id), request).await
    }

    pub async fn respond_as_buyer(&self, request: RespondRequest) -> AppResult<RespondOutcome> {
        let phone = request
            .buyer_phone
            .as_deref()
            .map(normalize_phone)
            .filter(|phone| !phone.is_empty())
            .ok_or_else(|| AppError::validation("buyerPhone is required"))?;
        self.respond(Responder::Buyer(phone), request).await
    }

    async fn respond(&self, responder: Responder, request: RespondRequest) -> AppResult<RespondOutcome> {
        let now = Utc::now();
        let party = responder.party();

        let mut tx = self.db.begin().await?;
        let mut bargain = tx
            .bargain(request.bargain_id)
            .await?
            .ok_or_else(|| match responder {
                Responder::Seller(_) => AppError::not_found(NOT_FOUND),
                Responder::Buyer(_) => AppError::not_found(NOT_FOUND_FOR_BUYER),
            })?;
        responder.authorize(&bargain)?;

        if let Err(err) = bargain.ensure_open(now) {
            if err == NegotiationError::Expired {
                tx.save_bargain(&bargain).await?;
                tx.commit().await?;
                tracing::info!(bargain_id = %bargain.id, "Bargain expired");
            }
            return Err(err.into());
        }

        match request.action {
            ResponseAction::Accept => {
                bargain.accept(party, now);
                tracing::info!(
                    bargain_id = %bargain.id,
                    by = %party,
                    accepted_price = ?bargain.accepted_price,
                    "Bargain accepted"
                );
            }
            ResponseAction::Reject => {
                bargain.reject(now);
                tracing::info!(bargain_id = %bargain.id, by = %party, "Bargain rejected");
            }
            ResponseAction::Counter => {
                let total = request.total_counter_price.unwrap_or_default();
                let offer = catalog::validate_offer(
                    tx.as_mut(),
                    OfferKind::Counter,
                    &request.items,
                    total,
                    "totalCounterPrice",
                    Some(bargain.seller_id),
                )
                .await?;
                let counter = Offer {
                    items: offer.items,
                    total_price: total,
                    note: request.note.as_deref().and_then(non_empty),
                    time: now,
                };
                bargain.counter(party, counter, now)?;
                tracing::info!(bargain_id = %bargain.id, by = %party, total, "Bargain countered");
            }
        }

        tx.save_bargain(&bargain).await?;
        tx.commit().await?;
        Ok(RespondOutcome::from(&bargain))
    }

    /// Puts the final terms of an accepted bargain into the buyer's cart.
    pub async fn add_to_cart(&self, bargain_id: Uuid, buyer_phone: &str) -> AppResult<Cart> {
        let phone = normalize_phone(buyer_phone);
        if phone.is_empty() {
            return Err(AppError::validation("buyerPhone is required"));
        }
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let mut bargain = tx
            .bargain(bargain_id)
            .await?
            .filter(|bargain| bargain.belongs_to_buyer(&phone))
            .ok_or_else(|| AppError::not_found(NOT_FOUND_FOR_BUYER))?;

        let mut cart = tx
            .cart(&phone)
            .await?
            .unwrap_or_else(|| Cart::empty(&phone, now));
        if cart.contains_bargain(bargain.id) {
            return Err(NegotiationError::AlreadyAdded.into());
        }

        for line in reserve_lines(tx.as_mut(), &mut bargain, now).await? {
            cart.upsert(line);
        }
        cart.updated_at = now;

        tx.save_bargain(&bargain).await?;
        tx.save_cart(&cart).await?;
        tx.commit().await?;

        tracing::info!(bargain_id = %bargain.id, lines = cart.items.len(), "Bargain added to cart");
        Ok(cart)
    }

    pub async fn seller_bargains(&self, seller_id: Uuid) -> AppResult<Vec<BargainView>> {
        let mut tx = self.db.begin().await?;
        let mut bargains = tx.bargains_by_seller(seller_id).await?;
        bargains.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bargains.iter().map(BargainView::from).collect())
    }

    pub async fn buyer_bargains(&self, buyer_phone: &str) -> AppResult<Vec<BargainView>> {
        let phone = normalize_phone(buyer_phone);
        let mut tx = self.db.begin().await?;
        let mut bargains = tx.bargains_by_buyer(&phone).await?;
        bargains.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bargains.iter().map(BargainView::from).collect())
    }

    pub async fn bargain_for_buyer(&self, id: Uuid, buyer_phone: &str) -> AppResult<BuyerBargainView> {
        let phone = normalize_phone(buyer_phone);
        let mut tx = self.db.begin().await?;
        tx.bargain(id)
            .await?
            .filter(|bargain| bargain.belongs_to_buyer(&phone))
            .map(|bargain| BuyerBargainView::from(&bargain))
            .ok_or_else(|| AppError::not_found(NOT_FOUND_FOR_BUYER))
    }

    /// Accepted bargains not yet in a cart, flattened into priced items.
    pub async fn successful_items(&self, buyer_phone: &str) -> AppResult<Vec<BargainItemView>> {
        let phone = normalize_phone(buyer_phone);
        let mut tx = self.db.begin().await?;
        let bargains = tx.bargains_by_buyer(&phone).await?;

        let mut items = Vec::new();
        for bargain in &bargains {
            if !bargain.is_pending_pickup() {
                continue;
            }
            let Some(terms) = bargain.final_terms() else {
                continue;
            };
            let unit_price = terms.unit_price();
            for item in &terms.items {
                let product = tx.product(item.product_id).await?;
                items.push(BargainItemView {
                    bargain_id: bargain.id,
                    product_id: item.product_id,
                    seller_id: bargain.seller_id,
                    product_name: product
                        .as_ref()
                        .map(|p| p.name.clone())
                        .or_else(|| item.product_name.clone())
                        .unwrap_or_default(),
                    price: unit_price,
                    quantity: item.quantity,
                    image_url: product.map(|p| p.image_url()).unwrap_or_default(),
                });
            }
        }
        Ok(items)
    }

    pub async fn delete(&self, seller_id: Uuid, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let bargain = tx
            .bargain(id)
            .await?
            .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
        if bargain.seller_id != seller_id {
            return Err(AppError::forbidden("Not authorized to delete this bargain"));
        }
        bargain.ensure_deletable()?;

        tx.delete_bargain(id).await?;
        tx.commit().await?;
        tracing::info!(bargain_id = %id, "Bargain deleted");
        Ok(())
    }
}

/// Reserves `bargain` for its buyer's cart and prices one line per final item.
pub(crate) async fn reserve_lines(
    tx: &mut dyn Tx,
    bargain: &mut Bargain,
    now: DateTime<Utc>,
) -> AppResult<Vec<CartItem>> {
    let terms = bargain.reserve_for_cart(now)?;
    let lines = price_lines(tx, bargain, &terms).await?;
    Ok(lines)
}

async fn price_lines(tx: &mut dyn Tx, bargain: &Bargain, terms: &FinalTerms) -> AppResult<Vec<CartItem>> {
    let unit_price = terms.unit_price();
    let location = catalog::seller_location(tx, bargain.seller_id).await?;
    let mut lines = Vec::with_capacity(terms.items.len());
    for item in &terms.items {
        let product = tx
            .product(item.product_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product not found: {}", item.product_id)))?;
        lines.push(CartItem::snapshot(&product, &location, item.quantity, unit_price).from_bargain(bargain.id));
    }
    Ok(lines)
}

/// Every accepted bargain of the buyer still waiting for a cart, reserved
/// and priced. Used by cart sync.
pub(crate) async fn reserve_pending(
    tx: &mut dyn Tx,
    buyer_phone: &str,
    now: DateTime<Utc>,
) -> AppResult<Vec<CartItem>> {
    let mut lines = Vec::new();
    for mut bargain in tx.bargains_by_buyer(buyer_phone).await? {
        if !bargain.is_pending_pickup() || bargain.final_terms().is_none() {
            continue;
        }
        lines.extend(reserve_lines(tx, &mut bargain, now).await?);
        tx.save_bargain(&bargain).await?;
        tracing::debug!(bargain_id = %bargain.id, "Bargain folded into cart sync");
    }
    Ok(lines)
}

fn non_empty(note: &str) -> Option<String> {
    let note = note.trim();
    (!note.is_empty()).then(|| note.to_string())
}
