use askama::Template;

/// Home page. Checked against `templates/home.html` at compile time.
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub abc: u32,
    pub debug: bool,
}

impl HomeTemplate {
    pub fn new(debug: bool) -> Self {
        Self { abc: 123, debug }
    }
}
