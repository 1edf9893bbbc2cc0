//! The built-in abilities.
//!
//! Each submodule exposes an `ID`, a default [`manifest`](grocery::manifest)
//! and a [`Conversation`](crate::session::Conversation) implementation.

pub mod converter;
pub mod grocery;
pub mod journal;
pub mod trivia;
pub mod weather;

use std::sync::Arc;

use ability_adapters::WeatherClient;

use crate::host::{Ability, ConversationAbility};

/// Every built-in ability, ready to register with an
/// [`AbilityHost`](crate::host::AbilityHost).
pub fn builtin_abilities(weather_client: WeatherClient) -> Vec<Arc<dyn Ability>> {
    vec![
        Arc::new(ConversationAbility::new(grocery::manifest(), grocery::GroceryList::new)),
        Arc::new(ConversationAbility::new(weather::manifest(), move || {
            weather::WeatherSession::new(weather_client.clone())
        })),
        Arc::new(ConversationAbility::new(journal::manifest(), journal::Journal::new)),
        Arc::new(ConversationAbility::new(converter::manifest(), converter::Converter::new)),
        Arc::new(ConversationAbility::new(trivia::manifest(), trivia::Trivia::new)),
    ]
}
