//! `{key}` placeholder interpolation for titles, messages and webhook
//! parameters.

/// Replace every `{key}` with its value. Unknown placeholders are left as is.
///
/// Substituted values are never re-scanned, so a value that itself contains
/// `{key}` is inserted verbatim.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let value = after
            .find('}')
            .and_then(|end| {
                let key = &after[..end];
                values
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| (*v, end))
            });

        match value {
            Some((value, end)) => {
                rendered.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}
