//! Prompt builder module for the messages and components of the purchase flow
//!
//! Prompts are platform-neutral values. The Discord adapter renders them with
//! serenity builders; tests inspect them directly.

use tracing::warn;

use crate::bot::interaction::{
    InteractionId, InteractionUser, PaymentMethod, PaymentPage, ProductCategory,
};
use crate::catalog::{Product, Variant};
use crate::selection::Selection;

/// Accent colour of every payment message
pub const EMBED_COLOUR: u32 = 0xc6db0b;

/// Discord caps select menus at 25 options
pub const MAX_SELECT_OPTIONS: usize = 25;

/// Discord caps option labels at 100 characters
const MAX_OPTION_LABEL: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl Button {
    pub fn primary(id: InteractionId, label: &str) -> Self {
        Self {
            custom_id: id.custom_id().to_string(),
            label: label.to_string(),
            style: ButtonStyle::Primary,
        }
    }

    pub fn danger(id: InteractionId, label: &str) -> Self {
        Self {
            style: ButtonStyle::Danger,
            ..Self::primary(id, label)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: String,
    pub options: Vec<SelectOption>,
}

/// One action row: either buttons or a single select menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentRow {
    Buttons(Vec<Button>),
    SelectMenu(SelectMenu),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub description: String,
    pub colour: u32,
    pub thumbnail: Option<String>,
    pub footer: Option<EmbedFooter>,
    /// Stamp the embed with the send time
    pub timestamp: bool,
}

/// A message the bot posts into a channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub components: Vec<ComponentRow>,
}

impl Prompt {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_row(mut self, row: ComponentRow) -> Self {
        self.components.push(row);
        self
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Custom ids of every button in the prompt, in display order
    pub fn button_ids(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter_map(|row| match row {
                ComponentRow::Buttons(buttons) => Some(buttons),
                ComponentRow::SelectMenu(_) => None,
            })
            .flatten()
            .map(|button| button.custom_id.as_str())
            .collect()
    }

    /// The select menu carried by the prompt, if any
    pub fn select_menu(&self) -> Option<&SelectMenu> {
        self.components.iter().find_map(|row| match row {
            ComponentRow::SelectMenu(menu) => Some(menu),
            ComponentRow::Buttons(_) => None,
        })
    }
}

fn back_to_home_row() -> ComponentRow {
    ComponentRow::Buttons(vec![Button::primary(
        InteractionId::BackToHome,
        "Home Page (Back)",
    )])
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_OPTION_LABEL {
        label.to_string()
    } else {
        let cut: String = label.chars().take(MAX_OPTION_LABEL - 3).collect();
        format!("{}...", cut)
    }
}

/// Initial yes/no prompt posted into a new ticket channel
pub fn confirmation_prompt() -> Prompt {
    Prompt::text(
        "Hello, it looks like you've created a Ticket. Would you like to purchase a product today?",
    )
    .with_row(ComponentRow::Buttons(vec![
        Button::primary(InteractionId::ConfirmPurchase, "YES"),
        Button::danger(InteractionId::DeclinePurchase, "NO"),
    ]))
}

/// Reply to declining the purchase
pub fn declined_prompt() -> Prompt {
    Prompt::text("If you change your mind, let us know!")
}

/// Product-line buttons
pub fn category_prompt() -> Prompt {
    Prompt::text("Let’s proceed with the purchase.").with_row(ComponentRow::Buttons(
        ProductCategory::ALL
            .iter()
            .map(|category| Button::primary(InteractionId::Category(*category), category.label()))
            .collect(),
    ))
}

/// Product picklist for a category search, or a notice when nothing matched
pub fn product_menu_prompt(category: ProductCategory, products: &[Product]) -> Prompt {
    if products.is_empty() {
        return Prompt::text(format!(
            "No products are available for {} right now.",
            category.label()
        ))
        .with_row(back_to_home_row());
    }

    let options = capped(products, InteractionId::ProductMenu)
        .iter()
        .map(|product| SelectOption {
            label: truncate_label(&product.name),
            value: product.id.to_string(),
        })
        .collect();

    Prompt::text("Which product are we selecting today?")
        .with_row(ComponentRow::SelectMenu(SelectMenu {
            custom_id: InteractionId::ProductMenu.custom_id().to_string(),
            placeholder: "Choose a product...".to_string(),
            options,
        }))
        .with_row(back_to_home_row())
}

/// First [`MAX_SELECT_OPTIONS`] items; anything beyond cannot be offered
fn capped<T>(items: &[T], menu: InteractionId) -> &[T] {
    if items.len() > MAX_SELECT_OPTIONS {
        warn!(
            menu = menu.custom_id(),
            available = items.len(),
            shown = MAX_SELECT_OPTIONS,
            "Select menu truncated"
        );
    }
    &items[..items.len().min(MAX_SELECT_OPTIONS)]
}

/// Variant picklist for a variable product
pub fn variant_menu_prompt(variants: &[Variant]) -> Prompt {
    let options = capped(variants, InteractionId::VariantMenu)
        .iter()
        .map(|variant| SelectOption {
            label: truncate_label(&variant.display_name()),
            value: variant.id.to_string(),
        })
        .collect();

    Prompt::text("Please select a variant:")
        .with_row(ComponentRow::SelectMenu(SelectMenu {
            custom_id: InteractionId::VariantMenu.custom_id().to_string(),
            placeholder: "Select a variant".to_string(),
            options,
        }))
        .with_row(back_to_home_row())
}

/// Payment-method buttons for one page, under the given heading
pub fn payment_prompt(content: impl Into<String>, page: PaymentPage) -> Prompt {
    let mut buttons: Vec<Button> = page
        .methods()
        .iter()
        .map(|method| Button::primary(InteractionId::Payment(*method), method.label()))
        .collect();

    buttons.push(match page {
        PaymentPage::First => Button::primary(InteractionId::NextPaymentPage, "Next Page"),
        PaymentPage::Second => Button::primary(InteractionId::PreviousPaymentPage, "Back Page"),
    });

    Prompt::text(content)
        .with_row(ComponentRow::Buttons(buttons))
        .with_row(back_to_home_row())
}

pub fn product_chosen_prompt(product: &Product) -> Prompt {
    payment_prompt(
        format!("You selected: {}. Proceed to payment.", product.name),
        PaymentPage::First,
    )
}

pub fn variant_chosen_prompt(variant: &Variant) -> Prompt {
    payment_prompt(
        format!(
            "You selected variant: {}. Proceed to payment options.",
            variant.display_name()
        ),
        PaymentPage::First,
    )
}

pub fn payment_page_prompt(page: PaymentPage) -> Prompt {
    payment_prompt("Choose your payment method:", page)
}

fn method_thumbnail(method: PaymentMethod) -> Option<&'static str> {
    match method {
        PaymentMethod::Card => {
            Some("https://habra.com.my/wp-content/uploads/2016/06/logo-visa-mastercard.png.webp")
        }
        PaymentMethod::PayPal => {
            Some("https://upload.wikimedia.org/wikipedia/commons/a/a4/Paypal_2014_logo.png")
        }
        PaymentMethod::CashApp => Some(
            "https://upload.wikimedia.org/wikipedia/commons/thumb/c/c5/Square_Cash_app_logo.svg/1200px-Square_Cash_app_logo.svg.png",
        ),
        PaymentMethod::Venmo => {
            Some("https://upload.wikimedia.org/wikipedia/commons/8/84/Venmo_logo.png")
        }
        PaymentMethod::Skrill => Some(
            "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcQ6kH1ZEz3nFlx5QJuHMO0xAt0RehT1DklYX-smP-hzKw&s",
        ),
        PaymentMethod::Paysafecard => {
            Some("https://www.pays.de/wp-content/uploads/2018/11/paysafe-card.png")
        }
        PaymentMethod::Other => None,
    }
}

/// Informational message for the chosen payment method
pub fn payment_message(
    method: PaymentMethod,
    selection: &Selection,
    user: &InteractionUser,
) -> Prompt {
    let item = selection.item_label().unwrap_or_default();
    let price = selection.price().unwrap_or_default();

    let description = match method {
        PaymentMethod::Card => format!(
            "__**Card Payment**__\n\n [Click Here]({})\n\nProduct: **{}**\nProduct Price: **${}**",
            selection.permalink().unwrap_or_default(),
            item,
            price
        ),
        PaymentMethod::PayPal => "__**PayPal Payment**__".to_string(),
        PaymentMethod::CashApp => "__**Cash App Payment**__".to_string(),
        PaymentMethod::Venmo => "__**Venmo Payment**__".to_string(),
        PaymentMethod::Skrill => "__**Skrill Payment**__".to_string(),
        PaymentMethod::Paysafecard => "__**PaySafe Payments**__".to_string(),
        PaymentMethod::Other => format!(
            "Product Selected: **{}**\nProduct Price: {}\nPayment Method: Other\n\nPlease wait for staff to assist you on this payment method.",
            item, price
        ),
    };

    Prompt::default().with_embed(Embed {
        description,
        colour: EMBED_COLOUR,
        thumbnail: method_thumbnail(method).map(str::to_string),
        footer: Some(EmbedFooter {
            text: format!("Command Executed By: {}", user.name),
            icon_url: user.avatar_url.clone(),
        }),
        timestamp: true,
    })
}

/// Error notice posted when a step cannot complete; the current prompt stays
pub fn error_notice(message: impl Into<String>) -> Prompt {
    Prompt::text(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u64, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            price: "9.99".to_string(),
            permalink: format!("https://shop.example.com/p/{}", id),
            variations: Vec::new(),
        }
    }

    fn user() -> InteractionUser {
        InteractionUser {
            id: 1,
            name: "buyer".to_string(),
            avatar_url: Some("https://cdn.example.com/a.png".to_string()),
        }
    }

    #[test]
    fn test_confirmation_prompt_buttons() {
        let prompt = confirmation_prompt();
        assert_eq!(prompt.button_ids(), vec!["buy_yes", "buy_no"]);
        match &prompt.components[0] {
            ComponentRow::Buttons(buttons) => assert_eq!(buttons[1].style, ButtonStyle::Danger),
            ComponentRow::SelectMenu(_) => panic!("expected buttons"),
        }
    }

    #[test]
    fn test_category_prompt_has_one_button_per_category() {
        assert_eq!(category_prompt().button_ids(), vec!["cs2", "gta", "rdr2"]);
    }

    #[test]
    fn test_product_menu_lists_products_with_back_button() {
        let products = vec![product(1, "Prime"), product(2, "Faceit Ready")];
        let prompt = product_menu_prompt(ProductCategory::CounterStrike2, &products);

        let menu = prompt.select_menu().expect("select menu");
        assert_eq!(menu.custom_id, "Products_SEL");
        assert_eq!(menu.options.len(), 2);
        assert_eq!(menu.options[1].value, "2");
        assert_eq!(prompt.button_ids(), vec!["Back_Button"]);
    }

    #[test]
    fn test_product_menu_is_capped_and_labels_truncated() {
        let long_name = "x".repeat(150);
        let products: Vec<Product> = (0..30).map(|i| product(i, &long_name)).collect();
        let prompt = product_menu_prompt(ProductCategory::GrandTheftAutoV, &products);

        let menu = prompt.select_menu().expect("select menu");
        assert_eq!(menu.options.len(), MAX_SELECT_OPTIONS);
        assert_eq!(menu.options[0].label.chars().count(), 100);
    }

    #[test]
    fn test_variant_menu_is_capped() {
        let variants: Vec<Variant> = (0..40)
            .map(|i| Variant {
                id: 1000 + i,
                name: format!("Region {}", i),
                price: "5.00".to_string(),
                permalink: String::new(),
                product_id: 42,
                attributes: Vec::new(),
            })
            .collect();

        let prompt = variant_menu_prompt(&variants);

        let menu = prompt.select_menu().expect("select menu");
        assert_eq!(menu.options.len(), MAX_SELECT_OPTIONS);
        assert_eq!(menu.options[24].value, "1024");
    }

    #[test]
    fn test_empty_search_has_no_menu() {
        let prompt = product_menu_prompt(ProductCategory::RedDeadRedemption2, &[]);
        assert!(prompt.select_menu().is_none());
        assert_eq!(prompt.button_ids(), vec!["Back_Button"]);
    }

    #[test]
    fn test_payment_pages() {
        assert_eq!(
            payment_page_prompt(PaymentPage::First).button_ids(),
            vec!["Card", "PayPal", "CashApp", "Paysafecard", "Next_Page_Payment", "Back_Button"]
        );
        assert_eq!(
            payment_page_prompt(PaymentPage::Second).button_ids(),
            vec!["Venmo", "Skrill", "Other", "Back_Page_Payment", "Back_Button"]
        );
    }

    #[test]
    fn test_card_message_links_product() {
        let selection = Selection {
            product: Some(product(5, "Prime")),
            variant: None,
        };
        let prompt = payment_message(PaymentMethod::Card, &selection, &user());

        let embed = &prompt.embeds[0];
        assert!(embed.description.contains("[Click Here](https://shop.example.com/p/5)"));
        assert!(embed.description.contains("Product: **Prime**"));
        assert!(embed.description.contains("**$9.99**"));
        assert_eq!(embed.colour, EMBED_COLOUR);
        assert_eq!(
            embed.footer.as_ref().map(|f| f.text.as_str()),
            Some("Command Executed By: buyer")
        );
    }

    #[test]
    fn test_other_message_has_no_thumbnail() {
        let selection = Selection {
            product: Some(product(5, "Prime")),
            variant: None,
        };
        let prompt = payment_message(PaymentMethod::Other, &selection, &user());

        assert!(prompt.embeds[0].thumbnail.is_none());
        assert!(prompt.embeds[0]
            .description
            .contains("Please wait for staff to assist you"));
        assert!(prompt.components.is_empty());
    }
}
