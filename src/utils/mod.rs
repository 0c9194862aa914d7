//! Small shared helpers.

pub mod id_generator;

pub use id_generator::IdGenerator;

/// Render a snake_case identifier as a human-readable Title Case name,
/// e.g. `to_upper` becomes `To Upper`.
#[must_use]
pub fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_cases_snake_names() {
        assert_eq!(title_case("to_upper"), "To Upper");
        assert_eq!(title_case("shout"), "Shout");
        assert_eq!(title_case("a__b"), "A B");
    }
}
