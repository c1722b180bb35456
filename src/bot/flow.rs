//! Purchase flow controller
//!
//! Interprets channel-creation events and component interactions, moves a
//! ticket channel through the purchase steps and keeps its selection up to
//! date:
//!
//! ```text
//! Idle ──ticket created──► AwaitingConfirmation ──yes──► AwaitingCategory
//!   ▲                            │ no                          │ category
//!   │                            ▼                             ▼
//!   ├──────────────────────── Idle               AwaitingProduct
//!   │                                              │ product   │ variable product
//!   │                                              ▼           ▼
//!   └──payment method── AwaitingPayment(page) ◄── variant ── AwaitingVariant
//! ```
//!
//! "Home Page (Back)" returns to the category prompt from any step. Every
//! successful step replaces the channel's prompt; a failed step posts one
//! error notice and leaves both the prompt and the selection untouched.
//! Handling is serialized per channel.

use std::sync::Arc;

use tracing::{debug, info, Instrument};

use crate::bot::interaction::{
    ChannelCreated, InteractionEvent, InteractionId, PaymentMethod, PaymentPage, ProductCategory,
};
use crate::bot::prompt::{self, Prompt};
use crate::bot::sink::PromptSink;
use crate::catalog::CatalogClient;
use crate::channel_lock::ChannelLocks;
use crate::errors::{error_logging, AppResult};
use crate::observability;
use crate::selection::{SelectionStore, SelectionUpdate};

/// Where a channel's flow stands after a handled event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Idle,
    AwaitingConfirmation,
    AwaitingCategory,
    AwaitingProduct,
    AwaitingVariant,
    AwaitingPayment(PaymentPage),
}

/// Why a step could not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFailure {
    /// The catalog search for a category failed
    SearchFailed,
    /// The picked product could not be loaded
    ProductNotFound,
    /// The product has variations but none could be listed
    VariationsUnavailable,
    /// The picked variant could not be loaded for the chosen product
    VariantNotFound,
    /// The step needs a product (and variant) chosen earlier in this channel
    MissingSelection,
    /// A select menu interaction arrived without a usable value
    InvalidSelection,
}

impl StepFailure {
    /// Notice posted to the channel
    pub fn message(self) -> &'static str {
        match self {
            StepFailure::SearchFailed => {
                "Error: Products could not be loaded right now. Please try again in a moment."
            }
            StepFailure::ProductNotFound => "Error: Product data not found.",
            StepFailure::VariationsUnavailable => {
                "Error: This product's variants could not be loaded. Please pick again or go back to the home page."
            }
            StepFailure::VariantNotFound => "Error: Variant data not found.",
            StepFailure::MissingSelection => {
                "Error: No product is selected in this ticket. Use Home Page (Back) to start again."
            }
            StepFailure::InvalidSelection => "Error: Nothing was selected.",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            StepFailure::SearchFailed => "search_failed",
            StepFailure::ProductNotFound => "product_not_found",
            StepFailure::VariationsUnavailable => "variations_unavailable",
            StepFailure::VariantNotFound => "variant_not_found",
            StepFailure::MissingSelection => "missing_selection",
            StepFailure::InvalidSelection => "invalid_selection",
        }
    }
}

/// Result of handling one interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The prompt was replaced and the channel moved to this stage
    Transitioned(FlowStage),
    /// An error notice was posted; prompt and selection are unchanged
    Halted(StepFailure),
    /// The custom id does not belong to this flow
    Ignored,
}

impl FlowOutcome {
    fn as_str(self) -> &'static str {
        match self {
            FlowOutcome::Transitioned(_) => "transitioned",
            FlowOutcome::Halted(failure) => failure.as_str(),
            FlowOutcome::Ignored => "ignored",
        }
    }
}

/// The purchase flow state machine
pub struct FlowController {
    catalog: Arc<dyn CatalogClient>,
    store: Arc<SelectionStore>,
    sink: Arc<dyn PromptSink>,
    locks: ChannelLocks,
    ticket_category_id: u64,
}

impl FlowController {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        store: Arc<SelectionStore>,
        sink: Arc<dyn PromptSink>,
        ticket_category_id: u64,
    ) -> Self {
        Self {
            catalog,
            store,
            sink,
            locks: ChannelLocks::new(),
            ticket_category_id,
        }
    }

    pub fn store(&self) -> &Arc<SelectionStore> {
        &self.store
    }

    /// Post the purchase prompt into channels created under the ticket category.
    ///
    /// Returns whether the prompt was posted.
    pub async fn handle_channel_created(&self, event: ChannelCreated) -> AppResult<bool> {
        if event.parent_id != Some(self.ticket_category_id) {
            debug!(
                channel_id = %event.channel_id,
                parent_id = ?event.parent_id,
                "Ignoring channel outside the ticket category"
            );
            return Ok(false);
        }

        self.sink
            .send(event.channel_id, prompt::confirmation_prompt())
            .instrument(observability::discord_span("ticket_created", event.channel_id))
            .await?;
        info!(channel_id = %event.channel_id, "Posted purchase prompt into new ticket");
        Ok(true)
    }

    /// Start the flow over in a channel: drop its selection and post the
    /// purchase prompt again.
    pub async fn restart(&self, channel_id: u64) -> AppResult<FlowStage> {
        let _guard = self.locks.acquire(channel_id).await;
        self.store.clear(channel_id);
        self.sink
            .send(channel_id, prompt::confirmation_prompt())
            .await?;
        Ok(FlowStage::AwaitingConfirmation)
    }

    /// Handle one component interaction.
    ///
    /// Errors are returned only when Discord itself cannot be reached; catalog
    /// problems surface as [`FlowOutcome::Halted`].
    pub async fn handle_interaction(&self, event: &InteractionEvent) -> AppResult<FlowOutcome> {
        let Some(id) = InteractionId::parse(&event.custom_id) else {
            debug!(custom_id = %event.custom_id, "Ignoring unknown interaction id");
            observability::record_interaction("unknown", FlowOutcome::Ignored.as_str());
            return Ok(FlowOutcome::Ignored);
        };

        let _guard = self.locks.acquire(event.channel_id).await;

        let span = observability::discord_span(id.action_name(), event.channel_id);
        let result = self.dispatch(id, event).instrument(span).await;

        match &result {
            Ok(outcome) => {
                observability::record_interaction(id.action_name(), outcome.as_str());
                debug!(
                    channel_id = %event.channel_id,
                    action = id.action_name(),
                    outcome = ?outcome,
                    "Interaction handled"
                );
            }
            Err(e) => {
                observability::record_interaction(id.action_name(), "error");
                error_logging::log_flow_error(
                    e,
                    id.action_name(),
                    event.channel_id,
                    Some(event.user.id),
                );
            }
        }
        observability::record_selection_store_size(self.store.len());

        result
    }

    async fn dispatch(&self, id: InteractionId, event: &InteractionEvent) -> AppResult<FlowOutcome> {
        match id {
            InteractionId::ConfirmPurchase => {
                self.replace(event, prompt::category_prompt()).await?;
                Ok(FlowOutcome::Transitioned(FlowStage::AwaitingCategory))
            }
            InteractionId::DeclinePurchase => {
                self.store.clear(event.channel_id);
                self.replace(event, prompt::declined_prompt()).await?;
                Ok(FlowOutcome::Transitioned(FlowStage::Idle))
            }
            InteractionId::BackToHome => {
                self.store.clear(event.channel_id);
                self.replace(event, prompt::category_prompt()).await?;
                Ok(FlowOutcome::Transitioned(FlowStage::AwaitingCategory))
            }
            InteractionId::Category(category) => self.choose_category(event, category).await,
            InteractionId::ProductMenu => self.choose_product(event).await,
            InteractionId::VariantMenu => self.choose_variant(event).await,
            InteractionId::Payment(method) => self.choose_payment(event, method).await,
            InteractionId::NextPaymentPage => self.show_payment_page(event, PaymentPage::Second).await,
            InteractionId::PreviousPaymentPage => {
                self.show_payment_page(event, PaymentPage::First).await
            }
        }
    }

    async fn choose_category(
        &self,
        event: &InteractionEvent,
        category: ProductCategory,
    ) -> AppResult<FlowOutcome> {
        let products = match self.catalog.search_products(category.search_term()).await {
            Ok(products) => products,
            Err(e) => {
                error_logging::log_flow_error(
                    &e,
                    "choose_category",
                    event.channel_id,
                    Some(event.user.id),
                );
                return self.halt(event, StepFailure::SearchFailed).await;
            }
        };

        debug!(
            category = category.search_term(),
            product_count = products.len(),
            "Catalog search completed"
        );
        self.replace(event, prompt::product_menu_prompt(category, &products))
            .await?;
        Ok(FlowOutcome::Transitioned(FlowStage::AwaitingProduct))
    }

    async fn choose_product(&self, event: &InteractionEvent) -> AppResult<FlowOutcome> {
        let Some(product_id) = event.selected_id() else {
            return self.halt(event, StepFailure::InvalidSelection).await;
        };

        let product = match self.catalog.get_product(product_id).await {
            Ok(Some(product)) => product,
            Ok(None) | Err(_) => return self.halt(event, StepFailure::ProductNotFound).await,
        };

        if !product.has_variations() {
            let next = prompt::product_chosen_prompt(&product);
            self.store
                .set(event.channel_id, SelectionUpdate::Product(product));
            self.replace(event, next).await?;
            return Ok(FlowOutcome::Transitioned(FlowStage::AwaitingPayment(
                PaymentPage::First,
            )));
        }

        let variants: Vec<_> = self
            .catalog
            .list_variations(product.id)
            .await
            .into_iter()
            .filter(|variant| variant.product_id == product.id)
            .collect();

        if variants.is_empty() {
            return self.halt(event, StepFailure::VariationsUnavailable).await;
        }

        self.store
            .set(event.channel_id, SelectionUpdate::Product(product));
        self.replace(event, prompt::variant_menu_prompt(&variants))
            .await?;
        Ok(FlowOutcome::Transitioned(FlowStage::AwaitingVariant))
    }

    async fn choose_variant(&self, event: &InteractionEvent) -> AppResult<FlowOutcome> {
        let Some(variant_id) = event.selected_id() else {
            return self.halt(event, StepFailure::InvalidSelection).await;
        };

        let Some(product) = self
            .store
            .get(event.channel_id)
            .and_then(|selection| selection.product)
        else {
            return self.halt(event, StepFailure::MissingSelection).await;
        };

        let Some(variant) = self.catalog.get_variation(product.id, variant_id).await else {
            return self.halt(event, StepFailure::VariantNotFound).await;
        };

        let next = prompt::variant_chosen_prompt(&variant);
        if !self
            .store
            .set(event.channel_id, SelectionUpdate::Variant(variant))
        {
            return self.halt(event, StepFailure::VariantNotFound).await;
        }

        self.replace(event, next).await?;
        Ok(FlowOutcome::Transitioned(FlowStage::AwaitingPayment(
            PaymentPage::First,
        )))
    }

    async fn choose_payment(
        &self,
        event: &InteractionEvent,
        method: PaymentMethod,
    ) -> AppResult<FlowOutcome> {
        let selection = self.store.get(event.channel_id).filter(|selection| {
            match &selection.product {
                Some(product) => !product.has_variations() || selection.variant.is_some(),
                None => false,
            }
        });
        let Some(selection) = selection else {
            return self.halt(event, StepFailure::MissingSelection).await;
        };

        self.replace(event, prompt::payment_message(method, &selection, &event.user))
            .await?;
        self.store.clear(event.channel_id);

        observability::record_checkout(method.custom_id());
        info!(
            channel_id = %event.channel_id,
            user_id = %event.user.id,
            payment_method = method.custom_id(),
            item = ?selection.item_label(),
            "Purchase flow completed"
        );
        Ok(FlowOutcome::Transitioned(FlowStage::Idle))
    }

    async fn show_payment_page(
        &self,
        event: &InteractionEvent,
        page: PaymentPage,
    ) -> AppResult<FlowOutcome> {
        self.replace(event, prompt::payment_page_prompt(page)).await?;
        Ok(FlowOutcome::Transitioned(FlowStage::AwaitingPayment(page)))
    }

    async fn replace(&self, event: &InteractionEvent, next: Prompt) -> AppResult<u64> {
        self.sink
            .replace_prompt(event.channel_id, event.message_id, next)
            .await
    }

    async fn halt(&self, event: &InteractionEvent, failure: StepFailure) -> AppResult<FlowOutcome> {
        debug!(
            channel_id = %event.channel_id,
            failure = failure.as_str(),
            "Purchase step halted"
        );
        self.sink
            .send(event.channel_id, prompt::error_notice(failure.message()))
            .await?;
        Ok(FlowOutcome::Halted(failure))
    }
}
