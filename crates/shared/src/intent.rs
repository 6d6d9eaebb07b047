use crate::models::{ChatMessage, ChatRole, RideClass};

const TRAILING_FILLER: [&str; 5] = ["please", "now", "asap", "today", "tonight"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RideSlots {
    pub pickup: Option<String>,
    pub dropoff: Option<String>,
    pub ride_class: Option<RideClass>,
}

impl RideSlots {
    pub fn route_complete(&self) -> bool {
        self.pickup.is_some() && self.dropoff.is_some()
    }
}

/// Scans the user messages of a session in order; later mentions overwrite
/// earlier ones, so a correction ("actually from Koramangala") wins.
pub fn extract_slots(history: &[ChatMessage]) -> RideSlots {
    let mut slots = RideSlots::default();

    for message in history {
        if message.role != ChatRole::User {
            continue;
        }

        let (pickup, dropoff) = extract_route(&message.content);
        if pickup.is_some() {
            slots.pickup = pickup;
        }
        if dropoff.is_some() {
            slots.dropoff = dropoff;
        }
        if let Some(ride_class) = detect_ride_class(&message.content) {
            slots.ride_class = Some(ride_class);
        }
    }

    slots
}

/// Pickup/dropoff from "from X to Y" phrasing; "to Y" alone fills only the
/// dropoff.
pub fn extract_route(text: &str) -> (Option<String>, Option<String>) {
    let normalized = text.to_ascii_lowercase();

    if let Some(from_idx) = find_word(&normalized, "from") {
        let after_from = from_idx + "from".len();
        if let Some(to_rel) = find_word(&normalized[after_from..], "to") {
            let to_idx = after_from + to_rel;
            let pickup = clean_location(&text[after_from..to_idx]);
            let dropoff = clean_location(&text[to_idx + "to".len()..]);
            return (pickup, dropoff);
        }

        return (clean_location(&text[after_from..]), None);
    }

    if let Some(to_idx) = find_word_last(&normalized, "to") {
        return (None, clean_location(&text[to_idx + "to".len()..]));
    }

    (None, None)
}

pub fn detect_ride_class(text: &str) -> Option<RideClass> {
    let normalized = text.to_ascii_lowercase();
    for ride_class in [RideClass::Economy, RideClass::Comfort, RideClass::Premium] {
        if find_word(&normalized, ride_class.as_str()).is_some() {
            return Some(ride_class);
        }
    }
    None
}

/// A message affirms booking when it contains "book" plus a class name, or
/// an explicit confirmation keyword.
pub fn is_booking_affirmation(text: &str) -> bool {
    let normalized = text.to_ascii_lowercase();

    if normalized.contains("book") && detect_ride_class(&normalized).is_some() {
        return true;
    }

    [
        "yes",
        "confirm",
        "confirmed",
        "go ahead",
        "sounds good",
        "sure",
        "ok",
        "okay",
    ]
    .iter()
    .any(|keyword| find_word(&normalized, keyword).is_some())
}

fn clean_location(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    if let Some(idx) = text.find(['.', ',', '!', '?', ';', '\n']) {
        text = &text[..idx];
    }

    let mut words: Vec<&str> = text.split_whitespace().collect();
    while let Some(last) = words.last() {
        if TRAILING_FILLER.contains(&last.to_ascii_lowercase().as_str()) {
            words.pop();
        } else {
            break;
        }
    }
    if let Some(first) = words.first()
        && first.eq_ignore_ascii_case("the")
    {
        words.remove(0);
    }

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(relative) = haystack[search_from..].find(needle) {
        let start = search_from + relative;
        let end = start + needle.len();
        let bounded_before = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|ch| !ch.is_alphanumeric());
        let bounded_after = haystack[end..]
            .chars()
            .next()
            .is_none_or(|ch| !ch.is_alphanumeric());

        if bounded_before && bounded_after {
            return Some(start);
        }
        search_from = end;
    }

    None
}

fn find_word_last(haystack: &str, needle: &str) -> Option<usize> {
    let mut found = None;
    let mut search_from = 0;
    while let Some(idx) = find_word(&haystack[search_from..], needle) {
        found = Some(search_from + idx);
        search_from += idx + needle.len();
    }
    found
}

#[cfg(test)]
mod tests {
    use super::{detect_ride_class, extract_route, extract_slots, is_booking_affirmation};
    use crate::models::{ChatMessage, RideClass};

    #[test]
    fn extract_route_handles_common_phrasings() {
        assert_eq!(
            extract_route("Book a cab from Indiranagar to Airport"),
            (Some("Indiranagar".to_string()), Some("Airport".to_string()))
        );
        assert_eq!(
            extract_route("I want to go from Koramangala to Whitefield please"),
            (
                Some("Koramangala".to_string()),
                Some("Whitefield".to_string())
            )
        );
        assert_eq!(
            extract_route("Need a ride to MG Road"),
            (None, Some("MG Road".to_string()))
        );
        assert_eq!(
            extract_route("From the airport to Electronic City, as soon as possible"),
            (
                Some("airport".to_string()),
                Some("Electronic City".to_string())
            )
        );
        assert_eq!(extract_route("hello"), (None, None));
        assert_eq!(extract_route("heading downtown tomorrow"), (None, None));
    }

    #[test]
    fn detect_ride_class_requires_a_whole_keyword() {
        assert_eq!(
            detect_ride_class("book an economy cab"),
            Some(RideClass::Economy)
        );
        assert_eq!(detect_ride_class("Premium please"), Some(RideClass::Premium));
        assert_eq!(detect_ride_class("make it comfortable"), None);
        assert_eq!(detect_ride_class("no preference"), None);
    }

    #[test]
    fn affirmation_matches_book_plus_class_or_plain_confirmation() {
        assert!(is_booking_affirmation("Book economy"));
        assert!(is_booking_affirmation("book the premium one"));
        assert!(is_booking_affirmation("yes"));
        assert!(is_booking_affirmation("Sounds good, go ahead"));
        assert!(!is_booking_affirmation("how much is premium?"));
        assert!(!is_booking_affirmation("what are my options"));
    }

    #[test]
    fn slots_accumulate_across_turns_and_later_mentions_win() {
        let history = vec![
            ChatMessage::user("Need a cab from Indiranagar to Airport"),
            ChatMessage::assistant("Which ride class would you like?"),
            ChatMessage::user("actually from Koramangala to Airport, comfort"),
        ];

        let slots = extract_slots(&history);
        assert_eq!(slots.pickup.as_deref(), Some("Koramangala"));
        assert_eq!(slots.dropoff.as_deref(), Some("Airport"));
        assert_eq!(slots.ride_class, Some(RideClass::Comfort));
        assert!(slots.route_complete());
    }

    #[test]
    fn assistant_messages_never_contribute_slots() {
        let history = vec![ChatMessage::assistant(
            "Shall I book a ride from Indiranagar to Airport?",
        )];
        let slots = extract_slots(&history);
        assert_eq!(slots, super::RideSlots::default());
    }
}
