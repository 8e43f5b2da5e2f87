//! Renders search outcomes into persona reply text

use tracing::{debug, warn};

use crate::models::{FlightOffer, FlightQueryParams};
use crate::templates::{TemplateStore, category};

/// Reply used when even the generic template category is unavailable
pub const BUILTIN_GENERIC_REPLY: &str = "Blast! Some atmospheric interference is scrambling the \
    radio and the flight information won't come through. Let's wait for the fog to lift and try \
    that approach again.";

const PLACEHOLDER_OPEN: &str = "{{";
const PLACEHOLDER_CLOSE: &str = "}}";

/// Random generic error reply, never empty
#[must_use]
pub fn generic_reply(templates: &TemplateStore) -> String {
    templates
        .random_response(category::GENERIC_ERROR)
        .unwrap_or_else(|| BUILTIN_GENERIC_REPLY.to_string())
}

/// Turn a search outcome into reply text.
///
/// `None` means the provider failed and yields the generic reply. An empty
/// list yields the "no flights found" category. Otherwise the first two
/// offers fill the "flight result" category.
#[must_use]
pub fn format_offers(
    offers: Option<&[FlightOffer]>,
    params: &FlightQueryParams,
    templates: &TemplateStore,
) -> String {
    let Some(offers) = offers else {
        return generic_reply(templates);
    };

    let rendered = match offers {
        [] => render_no_flights(params, templates),
        [first, rest @ ..] => render_offers(first, rest.first(), templates),
    };

    match rendered {
        Some(text) if !has_placeholders(&text) => text,
        Some(text) => {
            warn!("Discarding reply with unresolved placeholders: {}", text);
            generic_reply(templates)
        }
        None => generic_reply(templates),
    }
}

fn render_no_flights(params: &FlightQueryParams, templates: &TemplateStore) -> Option<String> {
    let template = templates.random_response(category::NO_FLIGHTS_FOUND)?;
    let mut filler = Filler::new(template);
    filler.set("ORIGIN", Some(&params.origin_csv()));
    filler.set("DESTINATION", Some(&params.destination));
    Some(filler.finish())
}

fn render_offers(
    first: &FlightOffer,
    second: Option<&FlightOffer>,
    templates: &TemplateStore,
) -> Option<String> {
    let template = templates.random_response(category::FLIGHT_RESULT)?;

    let template = if second.is_none() {
        strip_second_offer_lines(&template)
    } else {
        template
    };

    let mut filler = Filler::new(template);
    if let Some(leg) = first.first_leg() {
        filler.set("ORIGIN", leg.departure_airport.name.as_deref());
        filler.set("DESTINATION", leg.arrival_airport.name.as_deref());
    }
    fill_offer(&mut filler, 1, first);
    if let Some(second) = second {
        fill_offer(&mut filler, 2, second);
    }

    debug!("Rendered flight result for {}", first);
    Some(filler.finish())
}

fn fill_offer(filler: &mut Filler, n: u8, offer: &FlightOffer) {
    let price = offer.price.map(|p| p.to_string());
    filler.set(&format!("PRICE_{n}"), price.as_deref());

    let Some(leg) = offer.first_leg() else {
        return;
    };
    let dep = &leg.departure_airport;
    let arr = &leg.arrival_airport;

    filler.set(&format!("AIRLINE_{n}"), leg.airline.as_deref());
    filler.set(&format!("DEPARTURE_AIRPORT_{n}"), dep.name.as_deref());
    filler.set(&format!("DEPARTURE_TIME_{n}"), dep.clock_time());
    filler.set(&format!("DEPARTURE_DATE_{n}"), dep.date());
    filler.set(&format!("ARRIVAL_AIRPORT_{n}"), arr.name.as_deref());
    filler.set(&format!("ARRIVAL_TIME_{n}"), arr.clock_time());
    filler.set(&format!("ARRIVAL_DATE_{n}"), arr.date());
}

/// Drop template lines that reference a second offer
fn strip_second_offer_lines(template: &str) -> String {
    template
        .lines()
        .filter(|line| !line.contains(&format!("_2{PLACEHOLDER_CLOSE}")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn has_placeholders(text: &str) -> bool {
    text.contains(PLACEHOLDER_OPEN) || text.contains(PLACEHOLDER_CLOSE)
}

/// Placeholder substitution; missing values leave the placeholder in place
struct Filler {
    text: String,
}

impl Filler {
    fn new(text: String) -> Self {
        Self { text }
    }

    fn set(&mut self, name: &str, value: Option<&str>) {
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            return;
        };
        let key = format!("{PLACEHOLDER_OPEN}{name}{PLACEHOLDER_CLOSE}");
        self.text = self.text.replace(&key, value);
    }

    fn finish(self) -> String {
        self.text
    }
}
