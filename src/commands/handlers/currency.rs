//! Currency buttons and the conversion form
//!
//! Handles: `currency:*`
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Rate table requests are deferred
//! - 1.1.0: Unknown currency codes re-open the form with the previous input
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};

use crate::commands::context::CommandContext;
use crate::commands::handler::InteractionHandler;
use crate::commands::reply::Reply;
use crate::core::{Button, Form, FormField, FormValues, Keyboard, Screen, Style};
use crate::features::currency::{format_conversion, format_rates, parse_conversion};

pub const FORM_ID: &str = "currency:form";

pub struct CurrencyHandler;

fn conversion_form(draft: Option<&FormValues>) -> Form {
    Form::new(FORM_ID, "Currency conversion").field(
        FormField::short("query", "Amount, from and to")
            .placeholder("100 USD RUB")
            .max_length(40)
            .value(draft.map(|d| d.get("query"))),
    )
}

fn rates_keyboard() -> Keyboard {
    Keyboard::new().row(vec![
        Button::new("🔄 Convert", "currency:convert").style(Style::Primary),
        Button::new("◀️ Back", "menu:main"),
    ])
}

fn unavailable(error: &anyhow::Error) -> Reply {
    warn!("Currency rates request failed: {error:#}");
    Reply::failure("❌ Couldn't get currency rates. Please try again later.")
}

#[async_trait]
impl InteractionHandler for CurrencyHandler {
    fn prefix(&self) -> &'static str {
        "currency"
    }

    fn reaches_network(&self, action: &str) -> bool {
        action == "rates"
    }

    async fn handle_button(&self, ctx: &CommandContext, user_id: u64, action: &str) -> Result<Reply> {
        match action {
            "rates" => Ok(match ctx.currency.rates().await {
                Ok(table) => Reply::Update(Screen::new(format_rates(&table), rates_keyboard())),
                Err(e) => unavailable(&e),
            }),
            "convert" => Ok(Reply::Form(conversion_form(ctx.draft(user_id, FORM_ID).as_ref()))),
            _ => Ok(Reply::Notice("Unknown currency action.".to_string())),
        }
    }

    async fn handle_form(
        &self,
        ctx: &CommandContext,
        user_id: u64,
        action: &str,
        values: &FormValues,
    ) -> Result<Reply> {
        if action != "form" {
            return Ok(Reply::Notice("Unknown currency form.".to_string()));
        }

        let rejected = |error: anyhow::Error| {
            warn!("Rejected conversion from user {user_id}: {error}");
            ctx.save_draft(user_id, FORM_ID, values.clone());
            Reply::retry(
                format!("❌ {error}\n\nExample: `100 USD RUB`"),
                "currency:convert",
                "currency:rates",
            )
        };

        let request = match parse_conversion(values.get("query")) {
            Ok(request) => request,
            Err(e) => return Ok(rejected(e)),
        };
        let table = match ctx.currency.rates().await {
            Ok(table) => table,
            Err(e) => return Ok(unavailable(&e)),
        };

        match table.convert(request.amount, &request.from, &request.to) {
            Ok(result) => {
                ctx.clear_draft(user_id, FORM_ID);
                info!(
                    "User {user_id} converted {} {} to {}",
                    request.amount, request.from, request.to
                );
                Ok(Reply::Update(Screen::new(
                    format_conversion(&request, result),
                    Keyboard::new().row(vec![
                        Button::new("🔄 Convert again", "currency:convert").style(Style::Primary),
                        Button::new("💱 Rates", "currency:rates"),
                        Button::new("◀️ Menu", "menu:main"),
                    ]),
                )))
            }
            Err(e) => Ok(rejected(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::context::test_context;
    use crate::features::currency::client::{fixtures, DailyResponse};
    use crate::features::currency::RateTable;

    async fn seeded_context() -> CommandContext {
        let ctx = test_context().await;
        let raw: DailyResponse = serde_json::from_str(fixtures::DAILY).unwrap();
        ctx.currency.seed(RateTable::from(raw)).await;
        ctx
    }

    fn query(text: &str) -> FormValues {
        [("query", text)].into_iter().collect()
    }

    #[tokio::test]
    async fn test_conversion_uses_cached_rates() {
        let ctx = seeded_context().await;
        let reply = CurrencyHandler
            .handle_form(&ctx, 1, "form", &query("100 usd eur"))
            .await
            .unwrap();
        // 100 × 90 / 99
        assert!(reply.screen().unwrap().text.contains("90.91 EUR"));

        let to_rub = CurrencyHandler
            .handle_form(&ctx, 1, "form", &query("2,5 JPY RUB"))
            .await
            .unwrap();
        assert!(to_rub.screen().unwrap().text.contains("1.50 RUB"));
    }

    #[tokio::test]
    async fn test_unknown_currency_keeps_draft() {
        let ctx = seeded_context().await;
        let reply = CurrencyHandler
            .handle_form(&ctx, 1, "form", &query("10 XYZ RUB"))
            .await
            .unwrap();
        let screen = reply.screen().unwrap();
        assert!(screen.text.contains("Unknown currency: XYZ"));
        assert!(screen.keyboard.find("currency:convert").is_some());
        assert_eq!(ctx.draft(1, FORM_ID), Some(query("10 XYZ RUB")));
    }

    #[tokio::test]
    async fn test_bad_format_rejected_before_fetch() {
        // Rates are not seeded; a parse error must not reach the network
        let ctx = test_context().await;
        let reply = CurrencyHandler
            .handle_form(&ctx, 1, "form", &query("hundred dollars"))
            .await
            .unwrap();
        assert!(reply.screen().unwrap().text.contains("AMOUNT FROM TO"));
    }

    #[tokio::test]
    async fn test_rates_screen() {
        let ctx = seeded_context().await;
        let reply = CurrencyHandler.handle_button(&ctx, 1, "rates").await.unwrap();
        let screen = reply.screen().unwrap();
        assert!(screen.text.contains("**USD**: 90.00 ₽"));
        assert!(screen.keyboard.find("currency:convert").is_some());
    }
}
