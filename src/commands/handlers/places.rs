//! Place search buttons and the location form
//!
//! Handles: `places:*`
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.2.0: Searches are deferred while the map service answers
//! - 1.1.0: Location kept in settings, result pages served from the cached search
//! - 1.0.0: Initial release

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};

use super::{parse_arg, split_action};
use crate::commands::context::CommandContext;
use crate::commands::handler::InteractionHandler;
use crate::commands::reply::Reply;
use crate::core::{escape_markdown, Form, FormField, FormValues, Screen};
use crate::database::Location;
use crate::features::places::{
    category_screen, location_prompt_screen, parse_coordinates, results_screen, Coordinates,
    PlaceCategory, PlaceSearch,
};

pub const FORM_ID: &str = "places:location_form";

pub struct PlacesHandler;

fn location_form(draft: Option<&FormValues>) -> Form {
    Form::new(FORM_ID, "Search location").field(
        FormField::short("query", "Address or coordinates")
            .placeholder("Lenina 36, Volzhskiy  or  48.78, 44.77")
            .max_length(200)
            .value(draft.map(|d| d.get("query"))),
    )
}

fn unavailable(error: &anyhow::Error) -> Reply {
    warn!("Place service request failed: {error:#}");
    Reply::failure("❌ Couldn't reach the map service. Please try again later.")
}

impl PlacesHandler {
    async fn saved_location(&self, ctx: &CommandContext, user_id: u64) -> Result<Option<(Coordinates, Option<String>)>> {
        let Some(settings) = ctx.database.get_settings(user_id).await? else {
            return Ok(None);
        };
        Ok(settings
            .location
            .and_then(|l| Coordinates::new(l.latitude, l.longitude))
            .map(|c| (c, settings.location_label)))
    }

    async fn open(&self, ctx: &CommandContext, user_id: u64) -> Result<Screen> {
        Ok(match self.saved_location(ctx, user_id).await? {
            Some((_, label)) => category_screen(Some(&label_text(label.as_deref()))),
            None => location_prompt_screen(),
        })
    }

    async fn search(&self, ctx: &CommandContext, user_id: u64, key: Option<&str>) -> Result<Reply> {
        let Some(category) = key.and_then(PlaceCategory::from_key) else {
            return Ok(Reply::Notice("Unknown place type.".to_string()));
        };
        let Some((origin, _)) = self.saved_location(ctx, user_id).await? else {
            return Ok(Reply::Update(location_prompt_screen()));
        };

        let places = match ctx.places.search(origin, category).await {
            Ok(places) => places,
            Err(e) => return Ok(unavailable(&e)),
        };
        info!("User {user_id} found {} {}", places.len(), category.key());

        let search = PlaceSearch {
            category,
            origin,
            places,
        };
        let screen = results_screen(&search, 0);
        ctx.store_place_search(user_id, search);
        Ok(Reply::Update(screen))
    }

    async fn submit_location(&self, ctx: &CommandContext, user_id: u64, values: &FormValues) -> Result<Reply> {
        let query = values.get("query").trim();
        let resolved = match parse_coordinates(query) {
            Some(coordinates) => Some((coordinates, None)),
            None if query.is_empty() => None,
            None => match ctx.places.geocode(query).await {
                Ok(found) => found.map(|g| (g.coordinates, Some(g.label))),
                Err(e) => return Ok(unavailable(&e)),
            },
        };

        let Some((coordinates, label)) = resolved else {
            ctx.save_draft(user_id, FORM_ID, values.clone());
            return Ok(Reply::retry(
                "❌ Couldn't find that place. Try a fuller address or coordinates like `48.78, 44.77`.",
                "places:location",
                "places:open",
            ));
        };

        let location = Location {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
        };
        ctx.database.set_location(user_id, location, label.as_deref()).await?;
        ctx.clear_draft(user_id, FORM_ID);
        ctx.clear_place_search(user_id);
        info!("User {user_id} set search location");

        Ok(Reply::Update(category_screen(Some(&label_text(label.as_deref())))))
    }
}

/// Location header text; raw coordinates have no label
fn label_text(label: Option<&str>) -> String {
    match label {
        Some(label) if !label.is_empty() => escape_markdown(label),
        _ => "coordinates".to_string(),
    }
}

#[async_trait]
impl InteractionHandler for PlacesHandler {
    fn prefix(&self) -> &'static str {
        "places"
    }

    fn reaches_network(&self, action: &str) -> bool {
        action.starts_with("search")
    }

    async fn handle_button(&self, ctx: &CommandContext, user_id: u64, action: &str) -> Result<Reply> {
        let (name, mut args) = split_action(action);
        match name {
            "open" => Ok(Reply::Update(self.open(ctx, user_id).await?)),
            "types" => Ok(Reply::Update(self.open(ctx, user_id).await?)),
            "location" => Ok(Reply::Form(location_form(ctx.draft(user_id, FORM_ID).as_ref()))),
            "search" => self.search(ctx, user_id, args.next()).await,
            "page" => {
                let page = parse_arg::<usize>(args.next()).unwrap_or(0);
                Ok(Reply::Update(match ctx.place_search(user_id) {
                    Some(search) => results_screen(&search, page),
                    None => self.open(ctx, user_id).await?,
                }))
            }
            "noop" => Ok(Reply::Ack),
            _ => Ok(Reply::Notice("Unknown places action.".to_string())),
        }
    }

    async fn handle_form(
        &self,
        ctx: &CommandContext,
        user_id: u64,
        action: &str,
        values: &FormValues,
    ) -> Result<Reply> {
        match action {
            "location_form" => self.submit_location(ctx, user_id, values).await,
            _ => Ok(Reply::Notice("Unknown places form.".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::context::test_context;
    use crate::features::places::Place;

    fn query(text: &str) -> FormValues {
        [("query", text)].into_iter().collect()
    }

    #[tokio::test]
    async fn test_open_without_location_prompts() {
        let ctx = test_context().await;
        let reply = PlacesHandler.handle_button(&ctx, 1, "open").await.unwrap();
        assert!(reply.screen().unwrap().keyboard.find("places:location").is_some());

        // Searching also needs a location first
        let search = PlacesHandler.handle_button(&ctx, 1, "search:vet").await.unwrap();
        assert!(search.screen().unwrap().text.contains("Start by setting a location"));
    }

    #[tokio::test]
    async fn test_coordinates_saved_without_geocoding() {
        let ctx = test_context().await;
        let reply = PlacesHandler
            .handle_form(&ctx, 1, "location_form", &query("48.78, 44.77"))
            .await
            .unwrap();
        let screen = reply.screen().unwrap();
        assert!(screen.keyboard.find("places:search:pharmacies").is_some());

        let location = ctx.database.get_settings(1).await.unwrap().unwrap().location.unwrap();
        assert_eq!((location.latitude, location.longitude), (48.78, 44.77));
    }

    #[tokio::test]
    async fn test_address_lookup_failure_is_reported() {
        let ctx = test_context().await;
        let reply = PlacesHandler
            .handle_form(&ctx, 1, "location_form", &query("Lenina 36"))
            .await
            .unwrap();
        assert!(reply.screen().unwrap().text.contains("Couldn't reach the map service"));
        assert!(ctx.database.get_settings(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pages_come_from_cached_search() {
        let ctx = test_context().await;
        let origin = Coordinates::new(48.78, 44.77).unwrap();
        let places = (0..12)
            .map(|i| Place {
                name: format!("Shop {i}"),
                address: "Mira".to_string(),
                coordinates: origin,
                distance_km: i as f64 * 0.1,
            })
            .collect();
        ctx.store_place_search(
            1,
            PlaceSearch {
                category: PlaceCategory::Groceries,
                origin,
                places,
            },
        );

        let reply = PlacesHandler.handle_button(&ctx, 1, "page:1").await.unwrap();
        assert!(reply.screen().unwrap().text.contains("11. **Shop 10**"));
        assert_eq!(PlacesHandler.handle_button(&ctx, 1, "noop").await.unwrap(), Reply::Ack);

        // Without a cached search the user gets the entry screen
        let other = PlacesHandler.handle_button(&ctx, 2, "page:1").await.unwrap();
        assert!(other.screen().unwrap().text.contains("Places nearby"));
    }
}
