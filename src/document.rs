use std::fmt;

/// Generic markup element: a tag, attributes, and nested children.
/// Serializes in construction order.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(HtmlElement),
    Text(String),
}

impl HtmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }
}

impl From<HtmlElement> for Node {
    fn from(element: HtmlElement) -> Self {
        Node::Element(element)
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl fmt::Display for HtmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (key, value) in &self.attributes {
            write!(f, " {}=\"{}\"", key, value)?;
        }
        write!(f, ">")?;
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "</{}>", self.tag)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(element) => write!(f, "{}", element),
            Node::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Format a seconds duration as "Hh Mm", flooring both parts.
pub fn seconds_to_time_format(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{}h {}m", hours, minutes)
}

/// Split a camelCase column key into a space-separated uppercase title.
pub fn format_title(key: &str) -> String {
    let mut title = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.chars() {
        if c.is_uppercase() && prev_lower {
            title.push(' ');
        }
        prev_lower = c.is_lowercase();
        title.push(c);
    }
    title.to_uppercase()
}

/// One table cell value. Display decisions (duration formatting, the
/// "N/A" marker for missing story points) live here, in the rendering
/// layer, not in the data model.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Duration(i64),
    Points(Option<f64>),
}

impl Cell {
    fn render(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Duration(seconds) => seconds_to_time_format(*seconds),
            Cell::Points(None) => "N/A".to_string(),
            Cell::Points(Some(points)) => {
                if points.fract() == 0.0 {
                    format!("{}", *points as i64)
                } else {
                    points.to_string()
                }
            }
        }
    }
}

/// A record type that can be laid out as table rows.
pub trait TableRecord {
    fn columns() -> &'static [&'static str];
    fn cell(&self, column: &str) -> Cell;
}

/// Build a table element: one header row from the record columns (minus
/// skipped fields, plus `extra_columns` empty columns for manual
/// fill-in), then one row per record.
pub fn render_table<R: TableRecord>(
    records: &[R],
    skip_fields: &[&str],
    extra_columns: usize,
) -> HtmlElement {
    let keys: Vec<&str> = R::columns()
        .iter()
        .copied()
        .filter(|key| !skip_fields.contains(key))
        .collect();

    let mut header = HtmlElement::new("tr");
    for key in &keys {
        header = header.child(HtmlElement::new("th").child(format_title(key)));
    }
    for _ in 0..extra_columns {
        header = header.child(HtmlElement::new("th"));
    }

    let mut table = HtmlElement::new("table").child(header);
    for record in records {
        let mut row = HtmlElement::new("tr");
        for key in &keys {
            row = row.child(HtmlElement::new("td").child(record.cell(key).render()));
        }
        for _ in 0..extra_columns {
            row = row.child(HtmlElement::new("td"));
        }
        table = table.child(row);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_time_format() {
        assert_eq!(seconds_to_time_format(3661), "1h 1m");
        assert_eq!(seconds_to_time_format(0), "0h 0m");
        assert_eq!(seconds_to_time_format(59), "0h 0m");
        assert_eq!(seconds_to_time_format(7200), "2h 0m");
        assert_eq!(seconds_to_time_format(5400), "1h 30m");
    }

    #[test]
    fn test_format_title() {
        assert_eq!(format_title("spentTime"), "SPENT TIME");
        assert_eq!(format_title("aiRemarks"), "AI REMARKS");
        assert_eq!(format_title("key"), "KEY");
        assert_eq!(format_title("storyPoint"), "STORY POINT");
    }

    #[test]
    fn test_element_serialization_mirrors_construction_order() {
        let document = HtmlElement::new("div")
            .attr("class", "notes")
            .child(HtmlElement::new("h1").child("Title"))
            .child(HtmlElement::new("p").child("first").child(" second"));

        assert_eq!(
            document.to_string(),
            "<div class=\"notes\"><h1>Title</h1><p>first second</p></div>"
        );
    }

    #[test]
    fn test_element_serialization_is_deterministic() {
        let build = || {
            HtmlElement::new("ul")
                .child(HtmlElement::new("li").child("a"))
                .child(HtmlElement::new("li").child("b"))
        };

        assert_eq!(build(), build());
        assert_eq!(build().to_string(), build().to_string());
    }

    struct Row {
        name: String,
        seconds: i64,
        points: Option<f64>,
    }

    impl TableRecord for Row {
        fn columns() -> &'static [&'static str] {
            &["name", "spentTime", "storyPoint"]
        }

        fn cell(&self, column: &str) -> Cell {
            match column {
                "name" => Cell::Text(self.name.clone()),
                "spentTime" => Cell::Duration(self.seconds),
                "storyPoint" => Cell::Points(self.points),
                _ => Cell::Text(String::new()),
            }
        }
    }

    #[test]
    fn test_render_table_full() {
        let rows = vec![
            Row {
                name: "alpha".to_string(),
                seconds: 3661,
                points: Some(5.0),
            },
            Row {
                name: "beta".to_string(),
                seconds: 59,
                points: None,
            },
        ];

        let table = render_table(&rows, &[], 0).to_string();
        assert_eq!(
            table,
            "<table>\
             <tr><th>NAME</th><th>SPENT TIME</th><th>STORY POINT</th></tr>\
             <tr><td>alpha</td><td>1h 1m</td><td>5</td></tr>\
             <tr><td>beta</td><td>0h 0m</td><td>N/A</td></tr>\
             </table>"
        );
    }

    #[test]
    fn test_render_table_skip_and_extra_columns() {
        let rows = vec![Row {
            name: "alpha".to_string(),
            seconds: 0,
            points: Some(2.5),
        }];

        let table = render_table(&rows, &["spentTime"], 1).to_string();
        assert_eq!(
            table,
            "<table>\
             <tr><th>NAME</th><th>STORY POINT</th><th></th></tr>\
             <tr><td>alpha</td><td>2.5</td><td></td></tr>\
             </table>"
        );
    }

    #[test]
    fn test_render_table_no_records() {
        let table = render_table::<Row>(&[], &[], 0).to_string();
        assert_eq!(
            table,
            "<table><tr><th>NAME</th><th>SPENT TIME</th><th>STORY POINT</th></tr></table>"
        );
    }
}
