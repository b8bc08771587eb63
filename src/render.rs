use crate::controls::{Group, IndexBounds, RadioGroup};
use crate::page::{PageController, PageError};

pub const ANCHORS: [&str; 5] = ["particles", "branches", "ptypes", "index", "image"];

pub const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Halo images</title>
    <style>
      body { margin: 0; font-family: sans-serif; background: #101216; color: #e6e6e6; }
      #panel { display: flex; flex-wrap: wrap; gap: 24px; padding: 12px 16px; border-bottom: 1px solid #2a2f36; }
      fieldset { border: 1px solid #2a2f36; border-radius: 6px; padding: 6px 10px; }
      legend { font-size: 11px; text-transform: uppercase; letter-spacing: 0.1em; color: #9aa3ad; }
      label { font-size: 13px; margin-right: 10px; }
      input[type="number"] { width: 70px; }
      #display { padding: 12px 16px; }
      #display img { max-width: 100%; }
      .status { font-size: 14px; color: #b2bac4; }
    </style>
  </head>
  <body>
    <form id="panel" method="get" action="/" onchange="this.submit()">
      <fieldset><legend>Halo index</legend>{{index}}</fieldset>
      <fieldset><legend>Particles</legend>{{particles}}</fieldset>
      <fieldset><legend>Code branch</legend><div id="branches">{{branches}}</div></fieldset>
      <fieldset><legend>Component</legend><div id="ptypes">{{ptypes}}</div></fieldset>
      <noscript><button type="submit">Show</button></noscript>
    </form>
    <div id="display">{{image}}</div>
  </body>
</html>
"##;

/// Host page markup with `{{anchor}}` slots for the generated controls.
#[derive(Clone, Debug)]
pub struct PageTemplate {
    text: String,
}

impl PageTemplate {
    pub fn new(text: impl Into<String>) -> Result<Self, PageError> {
        let text = text.into();
        for anchor in ANCHORS {
            if !text.contains(&slot(anchor)) {
                return Err(PageError::MissingAnchor(anchor));
            }
        }
        Ok(PageTemplate { text })
    }

    pub fn builtin() -> Self {
        PageTemplate {
            text: INDEX_HTML.to_string(),
        }
    }

    pub fn render(&self, page: &PageController) -> String {
        let controls = page.controls();
        self.fill([
            radio_group_html(Group::Particles, controls.group(Group::Particles)),
            radio_group_html(Group::Branch, controls.group(Group::Branch)),
            radio_group_html(Group::Component, controls.group(Group::Component)),
            index_input_html(&controls.index),
            image_html(page.image_source()),
        ])
    }

    /// Page with no controls and a status line in place of the image.
    pub fn render_status(&self, message: &str) -> String {
        self.fill([
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            format!(r#"<p id="status" class="status">{}</p>"#, escape(message)),
        ])
    }

    fn fill(&self, parts: [String; 5]) -> String {
        let mut out = self.text.clone();
        for (anchor, html) in ANCHORS.iter().zip(parts) {
            out = out.replace(&slot(anchor), &html);
        }
        out
    }
}

fn slot(anchor: &str) -> String {
    format!("{{{{{anchor}}}}}")
}

fn radio_group_html(group: Group, radios: &RadioGroup) -> String {
    let mut html = String::new();
    for control in radios.controls() {
        html.push_str(&format!(
            r#"<label><input type="radio" name="{}" id="{}" value="{}"{} /> {}</label>"#,
            group.name(),
            escape(&control.id),
            escape(&control.value),
            if control.checked { " checked" } else { "" },
            escape(&control.label)
        ));
    }
    html
}

fn index_input_html(bounds: &IndexBounds) -> String {
    let max = bounds
        .max
        .map(|max| format!(r#" max="{max}""#))
        .unwrap_or_default();
    format!(
        r#"<input type="number" name="index" id="index" min="{}"{} step="{}" value="{}" />"#,
        bounds.min, max, bounds.step, bounds.value
    )
}

fn image_html(src: &str) -> String {
    format!(r#"<img id="image" src="{}" alt="" />"#, escape(src))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
