use kuchiki::traits::*;
use kuchiki::NodeRef;

fn is_list(node: &NodeRef) -> bool {
    node.as_element()
        .map(|e| matches!(e.name.local.as_ref(), "ul" | "ol"))
        .unwrap_or(false)
}

fn depth(node: &NodeRef) -> usize {
    node.ancestors().count()
}

/// Move lists that sit directly inside another list into the preceding `<li>`.
/// Wikified YouTrack descriptions contain such lists and htmd flattens them.
fn fix_nested_lists(html: &str) -> String {
    let document = kuchiki::parse_html().one(html);

    let mut misplaced: Vec<NodeRef> = match document.select("ul, ol") {
        Ok(lists) => lists
            .map(|list| list.as_node().clone())
            .filter(|node| node.parent().map(|p| is_list(&p)).unwrap_or(false))
            .collect(),
        Err(()) => return html.to_string(),
    };

    // Deepest first so moving an outer list never invalidates an inner one.
    misplaced.sort_by_key(|node| std::cmp::Reverse(depth(node)));

    for list in misplaced {
        let previous_item = list.preceding_siblings().find(|sibling| {
            sibling
                .as_element()
                .map(|e| e.name.local.as_ref() == "li")
                .unwrap_or(false)
        });

        if let Some(item) = previous_item {
            list.detach();
            item.append(list);
        }
    }

    document.to_string()
}

/// Convert an HTML description to markdown for terminal rendering.
pub fn html_to_markdown(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fixed_html = fix_nested_lists(html);

    let options = htmd::options::Options {
        ul_bullet_spacing: 1,
        ol_number_spacing: 1,
        ..Default::default()
    };
    let converter = htmd::HtmlToMarkdown::builder().options(options).build();

    match converter.convert(&fixed_html) {
        Ok(markdown) => markdown.trim().to_string(),
        Err(e) => {
            tracing::debug!("HTML to markdown conversion failed: {}", e);
            html.to_string()
        }
    }
}
