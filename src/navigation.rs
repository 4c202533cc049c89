//! The navigation bar shown at the top of every page.

use maud::{Markup, html};

use crate::endpoints;

/// The links in the navigation bar as `(url, title)`, in display order.
const LINKS: [(&str, &str); 2] = [
    (endpoints::DASHBOARD_VIEW, "Dashboard"),
    (endpoints::NEW_FORM_VIEW, "New Form"),
];

const CURRENT_LINK_STYLE: &str = "block py-2 px-3 text-white bg-blue-700 rounded-sm \
    lg:bg-transparent lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500";

const LINK_STYLE: &str = "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100 \
    lg:hover:bg-transparent lg:border-0 lg:hover:text-blue-700 lg:p-0 dark:text-white \
    lg:dark:hover:text-blue-500 dark:hover:bg-gray-700 dark:hover:text-white \
    lg:dark:hover:bg-transparent";

/// The navigation bar for the page at `active_endpoint`.
///
/// The link to `active_endpoint`, if there is one, is highlighted and marked with
/// `aria-current="page"`. Pages without a link of their own, such as a form's page, highlight
/// nothing.
pub struct NavBar<'a> {
    active_endpoint: &'a str,
}

impl<'a> NavBar<'a> {
    pub fn new(active_endpoint: &'a str) -> Self {
        Self { active_endpoint }
    }

    pub fn into_html(self) -> Markup {
        html!(
            nav class="bg-white border-gray-200 dark:bg-gray-900"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a
                        href=(endpoints::DASHBOARD_VIEW)
                        class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                    {
                        "HighRidge Forms"
                    }

                    ul class="font-medium flex flex-row space-x-8"
                    {
                        @for (url, title) in LINKS {
                            @let is_current = url == self.active_endpoint;

                            li {
                                a
                                    href=(url)
                                    class=(if is_current { CURRENT_LINK_STYLE } else { LINK_STYLE })
                                    aria-current=[is_current.then_some("page")]
                                {
                                    (title)
                                }
                            }
                        }
                    }
                }
            }
        )
    }
}
