use scraper::{ElementRef, Html, Selector};

#[track_caller]
pub(crate) fn must_get_form(html: &Html) -> ElementRef<'_> {
    html.select(&Selector::parse("form").unwrap())
        .next()
        .expect("No form found")
}

/// Find the input, select or textarea in `form` with the name `name`.
///
/// Names like `transactions[0].date` are matched literally.
#[track_caller]
pub(crate) fn must_get_input<'a>(form: &ElementRef<'a>, name: &str) -> ElementRef<'a> {
    let selector = Selector::parse("input, select, textarea").unwrap();

    form.select(&selector)
        .find(|element| element.value().attr("name") == Some(name))
        .unwrap_or_else(|| panic!("No input found with name \"{name}\""))
}

#[track_caller]
pub(crate) fn assert_hx_endpoint(form: &ElementRef<'_>, endpoint: &str, attribute: &str) {
    assert_eq!(
        form.value().attr(attribute),
        Some(endpoint),
        "want form with {attribute}=\"{endpoint}\""
    );
}

/// Assert that `form` has a required input `name` of type `type_`.
#[track_caller]
pub(crate) fn assert_form_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    let input = must_get_input(form, name);

    assert_eq!(input.value().attr("type"), Some(type_), "type of input {name}");
    assert!(
        input.value().attr("required").is_some(),
        "want input {name} to have the required attribute"
    );
}

/// Assert that `form` has an input `name` of type `type_` prefilled with `value`.
#[track_caller]
pub(crate) fn assert_form_input_with_value(
    form: &ElementRef<'_>,
    name: &str,
    type_: &str,
    value: &str,
) {
    let input = must_get_input(form, name);

    assert_eq!(input.value().attr("type"), Some(type_), "type of input {name}");
    assert_eq!(input.value().attr("value"), Some(value), "value of input {name}");
}

#[track_caller]
pub(crate) fn assert_form_submit_button_with_text(form: &ElementRef<'_>, text: &str) {
    let submit_button = form
        .select(&Selector::parse("button[type=submit]").unwrap())
        .next()
        .expect("No submit button found");

    assert_eq!(submit_button.text().collect::<String>().trim(), text);
}
