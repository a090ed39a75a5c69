//! # URL Templates
//!
//! Converts express-style paths into APIM url templates and generates the
//! operation identifiers and display names for new endpoints.

use crate::routes::endpoint::{Method, TemplateParameter};

/// Characters that mark a path part as a parameter
const PARAM_MARKERS: [char; 7] = [':', '?', '+', '*', '(', ')', '|'];

/// Maximum number of path characters kept in ids and display names
const MAX_NAME_PATH_LEN: usize = 30;

/// Run-scoped monotonic counter
///
/// Shared by operation ids and parameter disambiguation suffixes. Ids are only
/// stable across runs when a fresh counter is used for each extraction.
#[derive(Debug, Default)]
pub struct RunCounter(u64);

impl RunCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

fn is_param(part: &str) -> bool {
    part.contains(PARAM_MARKERS)
}

/// Apply `f` to every `/`, `-` and `.` separated part, keeping the separators
fn map_parts(path: &str, mut f: impl FnMut(&str) -> String) -> String {
    path.split('/')
        .map(|segment| {
            segment
                .split('-')
                .map(|piece| piece.split('.').map(&mut f).collect::<Vec<_>>().join("."))
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the APIM url template and its parameter list
///
/// Parameter names of two characters or fewer, or names already used by this
/// endpoint, get a `P{n}` suffix because APIM rejects short and duplicate names.
pub fn url_template(path: &str, counter: &mut RunCounter) -> (String, Vec<TemplateParameter>) {
    let mut parameters: Vec<TemplateParameter> = Vec::new();

    let template = map_parts(path, |part| {
        if !is_param(part) {
            return part.to_string();
        }

        let mut name: String = part.chars().filter(|c| !PARAM_MARKERS.contains(c)).collect();
        if name.len() <= 2 || parameters.iter().any(|p| p.name == name) {
            name = format!("{name}P{}", counter.next());
        }
        parameters.push(TemplateParameter::string(name.clone()));
        format!("{{{name}}}")
    });

    (template, parameters)
}

/// Path shape used to detect endpoints APIM cannot distinguish
pub fn shape_key(path: &str) -> String {
    map_parts(path, |part| {
        if is_param(part) {
            "{}".to_string()
        } else {
            part.to_lowercase()
        }
    })
}

/// Generate a unique operation id: `{slug}-{method}-{n}`
pub fn operation_id(path: &str, method: Method, counter: &mut RunCounter) -> String {
    let slug: String = path
        .trim()
        .trim_matches('/')
        .to_lowercase()
        .replace('/', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(MAX_NAME_PATH_LEN)
        .collect();
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "root" } else { slug };

    format!("{slug}-{method}-{}", counter.next())
}

/// Generate a readable operation name: `Get Users Id`
pub fn display_name(path: &str, method: Method) -> String {
    let words: String = path
        .trim()
        .trim_matches('/')
        .replace(['/', '-'], " ")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();
    let words = words
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    let words: String = words.chars().take(MAX_NAME_PATH_LEN).collect();

    format!("{} {}", capitalize(method.as_str()), words)
        .trim_end()
        .to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
