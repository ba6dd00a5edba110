//! Sticky note editor page
//!
//! Presentation only: the form has no action and nothing is saved.

use super::html_escape;

/// Editor form for a single note
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteEditor {
    pub title: String,
    pub body: String,
}

impl NoteEditor {
    /// Render the full HTML document
    pub fn render(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Sticky Notes</title>
</head>
<body>
  <section class="edit-section">
    <div class="nav-buttons"></div>
    <section>
      <form action="" onsubmit="return false">
        <input type="text" name="title" placeholder="Title" value="{title}">
        <textarea name="body" placeholder="Type something...">{body}</textarea>
        <button type="submit" class="save-button">Save</button>
      </form>
      <button type="button" class="cancel-button">Cancel</button>
    </section>
  </section>
</body>
</html>
"#,
            title = html_escape(&self.title),
            body = html_escape(&self.body),
        )
    }
}
