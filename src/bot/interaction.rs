//! Interaction vocabulary of the purchase flow.
//!
//! Every button and select menu the bot renders carries one of the custom ids
//! below. Inbound ids are parsed once into [`InteractionId`]; everything past
//! the parse boundary matches on the enum.

use std::fmt;

/// Product lines offered on the category prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductCategory {
    CounterStrike2,
    GrandTheftAutoV,
    RedDeadRedemption2,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 3] = [
        ProductCategory::CounterStrike2,
        ProductCategory::GrandTheftAutoV,
        ProductCategory::RedDeadRedemption2,
    ];

    /// Custom id of the category button, also used as the catalog search term
    pub fn custom_id(self) -> &'static str {
        match self {
            ProductCategory::CounterStrike2 => "cs2",
            ProductCategory::GrandTheftAutoV => "gta",
            ProductCategory::RedDeadRedemption2 => "rdr2",
        }
    }

    pub fn search_term(self) -> &'static str {
        self.custom_id()
    }

    pub fn label(self) -> &'static str {
        match self {
            ProductCategory::CounterStrike2 => "Counter Strike 2",
            ProductCategory::GrandTheftAutoV => "Grand Theft Auto V",
            ProductCategory::RedDeadRedemption2 => "Red Dead Redemption 2",
        }
    }
}

/// The two pages of payment-method buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentPage {
    First,
    Second,
}

impl PaymentPage {
    /// Methods shown on this page, in display order
    pub fn methods(self) -> &'static [PaymentMethod] {
        match self {
            PaymentPage::First => &[
                PaymentMethod::Card,
                PaymentMethod::PayPal,
                PaymentMethod::CashApp,
                PaymentMethod::Paysafecard,
            ],
            PaymentPage::Second => &[
                PaymentMethod::Venmo,
                PaymentMethod::Skrill,
                PaymentMethod::Other,
            ],
        }
    }
}

/// Payment methods the bot can post instructions for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Card,
    PayPal,
    CashApp,
    Paysafecard,
    Venmo,
    Skrill,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 7] = [
        PaymentMethod::Card,
        PaymentMethod::PayPal,
        PaymentMethod::CashApp,
        PaymentMethod::Paysafecard,
        PaymentMethod::Venmo,
        PaymentMethod::Skrill,
        PaymentMethod::Other,
    ];

    pub fn custom_id(self) -> &'static str {
        match self {
            PaymentMethod::Card => "Card",
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::CashApp => "CashApp",
            PaymentMethod::Paysafecard => "Paysafecard",
            PaymentMethod::Venmo => "Venmo",
            PaymentMethod::Skrill => "Skrill",
            PaymentMethod::Other => "Other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Card => "Debit/Credit Card",
            other => other.custom_id(),
        }
    }

    pub fn page(self) -> PaymentPage {
        match self {
            PaymentMethod::Card
            | PaymentMethod::PayPal
            | PaymentMethod::CashApp
            | PaymentMethod::Paysafecard => PaymentPage::First,
            PaymentMethod::Venmo | PaymentMethod::Skrill | PaymentMethod::Other => {
                PaymentPage::Second
            }
        }
    }
}

/// One logical action per interactive component the bot renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionId {
    ConfirmPurchase,
    DeclinePurchase,
    Category(ProductCategory),
    ProductMenu,
    VariantMenu,
    Payment(PaymentMethod),
    NextPaymentPage,
    PreviousPaymentPage,
    BackToHome,
}

impl InteractionId {
    /// Parse a component custom id; `None` for ids this bot never issues
    pub fn parse(custom_id: &str) -> Option<Self> {
        let id = match custom_id {
            "buy_yes" => InteractionId::ConfirmPurchase,
            "buy_no" => InteractionId::DeclinePurchase,
            "Products_SEL" => InteractionId::ProductMenu,
            "Variant_SEL" => InteractionId::VariantMenu,
            "Next_Page_Payment" => InteractionId::NextPaymentPage,
            "Back_Page_Payment" => InteractionId::PreviousPaymentPage,
            "Back_Button" => InteractionId::BackToHome,
            other => {
                if let Some(category) = ProductCategory::ALL
                    .into_iter()
                    .find(|c| c.custom_id() == other)
                {
                    InteractionId::Category(category)
                } else {
                    let method = PaymentMethod::ALL
                        .into_iter()
                        .find(|m| m.custom_id() == other)?;
                    InteractionId::Payment(method)
                }
            }
        };
        Some(id)
    }

    pub fn custom_id(self) -> &'static str {
        match self {
            InteractionId::ConfirmPurchase => "buy_yes",
            InteractionId::DeclinePurchase => "buy_no",
            InteractionId::Category(category) => category.custom_id(),
            InteractionId::ProductMenu => "Products_SEL",
            InteractionId::VariantMenu => "Variant_SEL",
            InteractionId::Payment(method) => method.custom_id(),
            InteractionId::NextPaymentPage => "Next_Page_Payment",
            InteractionId::PreviousPaymentPage => "Back_Page_Payment",
            InteractionId::BackToHome => "Back_Button",
        }
    }

    /// Stable label for logs and metrics
    pub fn action_name(self) -> &'static str {
        match self {
            InteractionId::ConfirmPurchase => "confirm_purchase",
            InteractionId::DeclinePurchase => "decline_purchase",
            InteractionId::Category(_) => "choose_category",
            InteractionId::ProductMenu => "choose_product",
            InteractionId::VariantMenu => "choose_variant",
            InteractionId::Payment(_) => "choose_payment",
            InteractionId::NextPaymentPage => "next_payment_page",
            InteractionId::PreviousPaymentPage => "previous_payment_page",
            InteractionId::BackToHome => "back_to_home",
        }
    }
}

impl fmt::Display for InteractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.custom_id())
    }
}

/// Kind of component that produced an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Button,
    SelectMenu,
}

/// The user who clicked, as far as the payment messages need it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionUser {
    pub id: u64,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Platform-neutral component interaction
#[derive(Debug, Clone)]
pub struct InteractionEvent {
    pub custom_id: String,
    pub kind: InteractionKind,
    /// Values picked in a select menu; empty for buttons
    pub values: Vec<String>,
    pub channel_id: u64,
    /// Message that carried the clicked component (the current prompt)
    pub message_id: Option<u64>,
    pub user: InteractionUser,
}

impl InteractionEvent {
    /// First selected value parsed as a catalog id
    pub fn selected_id(&self) -> Option<u64> {
        self.values.first().and_then(|v| v.trim().parse().ok())
    }
}

/// A channel was created somewhere in the guild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCreated {
    pub channel_id: u64,
    pub parent_id: Option<u64>,
}
