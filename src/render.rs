use crate::collect::{Chapter, ChapterIcon};
use crate::folding::{FoldingPolicy, Row, plan_rows};
use crate::formats::StoryId;
use crate::group::{ChapterGroup, GroupedChapters};
use crate::html::{escape_html, strip_tags};

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub hide_icons: bool,
    pub checkmarks: bool,
    pub default_icon: String,
}

pub fn render_chapter_list(
    story_id: StoryId,
    grouped: &GroupedChapters,
    policy: &FoldingPolicy,
    options: &RenderOptions,
) -> String {
    let mut out = String::new();
    out.push_str("<section id=\"chapters\" class=\"story__chapters\" data-finder=\"chapters\">\n");

    if grouped.is_empty() {
        out.push_str("  <div class=\"chapter-group\">\n");
        out.push_str("    <ol class=\"chapter-group__list\">\n");
        out.push_str("      <li class=\"chapter-group__list-item _empty\">\n");
        out.push_str("        <span>No chapters published yet.</span>\n");
        out.push_str("      </li>\n");
        out.push_str("    </ol>\n");
        out.push_str("  </div>\n");
    } else {
        let headers = grouped.has_group_headers();
        for group in &grouped.groups {
            render_group(&mut out, story_id, group, headers, policy, options);
        }
    }

    out.push_str("</section>\n");
    out
}

fn render_group(
    out: &mut String,
    story_id: StoryId,
    group: &ChapterGroup,
    header: bool,
    policy: &FoldingPolicy,
    options: &RenderOptions,
) {
    let folded_attr = if header { " data-folded=\"true\"" } else { "" };
    out.push_str(&format!(
        "  <div class=\"chapter-group _{}\"{folded_attr}>\n",
        escape_html(&group.key)
    ));

    if header {
        let name = escape_html(strip_tags(&group.name).trim());
        out.push_str(&format!(
            "    <button class=\"chapter-group__name\" aria-label=\"Toggle chapter group: {name}\" tabindex=\"0\">\n"
        ));
        out.push_str("      <i class=\"fa-solid fa-chevron-down chapter-group__heading-icon\"></i>\n");
        out.push_str(&format!("      <span>{name}</span>\n"));
        out.push_str("    </button>\n");
    }

    out.push_str("    <ol class=\"chapter-group__list\">\n");
    for row in plan_rows(group.chapters.len(), policy) {
        match row {
            Row::FoldToggle {
                hidden_count,
                order,
            } => {
                out.push_str(&format!(
                    "      <li class=\"chapter-group__list-item _folding-toggle\" style=\"order: {order}\">\n"
                ));
                out.push_str(&format!(
                    "        <button class=\"chapter-group__folding-toggle\" tabindex=\"0\">Show {hidden_count} more</button>\n"
                ));
                out.push_str("      </li>\n");
            }
            Row::Chapter {
                index,
                folded,
                order,
                ..
            } => {
                render_chapter_row(out, story_id, &group.chapters[index], folded, order, options);
            }
        }
    }
    out.push_str("    </ol>\n");
    out.push_str("  </div>\n");
}

fn render_chapter_row(
    out: &mut String,
    story_id: StoryId,
    chapter: &Chapter,
    folded: bool,
    order: usize,
    options: &RenderOptions,
) {
    let folded_class = if folded { " _foldable" } else { "" };
    out.push_str(&format!(
        "      <li class=\"chapter-group__list-item{folded_class}\" data-post-id=\"{}\" style=\"order: {order}\">\n",
        chapter.id
    ));

    if !options.hide_icons {
        match &chapter.icon {
            ChapterIcon::Text(text) => out.push_str(&format!(
                "        <span class=\"chapter-group__list-item-icon _text text-icon\">{}</span>\n",
                escape_html(text)
            )),
            ChapterIcon::Symbol(icon) => out.push_str(&format!(
                "        <i class=\"{} chapter-group__list-item-icon\"></i>\n",
                escape_html(icon)
            )),
            ChapterIcon::Default => out.push_str(&format!(
                "        <i class=\"{} chapter-group__list-item-icon\"></i>\n",
                escape_html(&options.default_icon)
            )),
        }
    }

    let password_class = if chapter.password { " _password" } else { "" };
    out.push_str(&format!(
        "        <a href=\"{}\" class=\"chapter-group__list-item-link truncate _1-1{password_class}\">\n",
        escape_html(&chapter.link)
    ));
    if let Some(prefix) = &chapter.prefix {
        out.push_str(&format!(
            "          <span class=\"chapter-group__list-item-prefix\">{}</span>\n",
            escape_html(prefix)
        ));
    }
    match &chapter.list_title {
        Some(list_title) => {
            out.push_str(&format!(
                "          <span class=\"chapter-group__list-item-title list-view\">{}</span>\n",
                chapter.title
            ));
            out.push_str(&format!(
                "          <span class=\"chapter-group__list-item-title grid-view\">{list_title}</span>\n"
            ));
        }
        None => {
            out.push_str(&format!("          {}\n", chapter.title));
        }
    }
    out.push_str("        </a>\n");

    if chapter.password {
        out.push_str(
            "        <i class=\"fa-solid fa-lock icon-password chapter-group__list-item-password\"></i>\n",
        );
    }

    out.push_str("        <div class=\"chapter-group__list-item-right\">\n");
    out.push_str(&format!(
        "          <time datetime=\"{}\" class=\"chapter-group__list-item-date\">\n",
        escape_html(&chapter.timestamp)
    ));
    out.push_str(&format!(
        "            <span class=\"list-view\">{}</span>\n",
        escape_html(&chapter.list_date)
    ));
    out.push_str(&format!(
        "            <span class=\"grid-view\">{}</span>\n",
        escape_html(&chapter.grid_date)
    ));
    out.push_str("          </time>\n");
    out.push_str(&format!(
        "          <span class=\"chapter-group__list-item-words\" data-number-switch=\"{}\">{} Words</span>\n",
        chapter.words,
        format_thousands(chapter.words)
    ));
    if !chapter.warning.is_empty() {
        out.push_str(&format!(
            "          <span class=\"chapter-group__list-item-warning list-view\" style=\"{}\">Warning: <b>{}</b></span>\n",
            escape_html(&chapter.warning_style),
            escape_html(&chapter.warning)
        ));
    }
    if options.checkmarks {
        out.push_str(&format!(
            "          <button class=\"checkmark chapter-group__list-item-checkmark\" data-type=\"chapter\" data-story-id=\"{story_id}\" data-id=\"{}\" role=\"checkbox\" aria-checked=\"false\" aria-label=\"Chapter checkmark for {}.\"><i class=\"fa-solid fa-check\"></i></button>\n",
            chapter.id, chapter.title
        ));
    }
    out.push_str("        </div>\n");
    out.push_str("      </li>\n");
}

pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx != 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
