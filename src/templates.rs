//! Sample Handlebars templates for testing and demonstration.
//!
//! Images are written with triple braces (`{{{avatar}}}`) so data URLs are
//! inserted unescaped.

/// Personnel training record: a header block with an avatar and a table of
/// course results.
///
/// Merge keys: `name`, `id_card`, `category`, `position`, `education`,
/// `major`, `company`, `company_code`, `avatar` (data URL, `resources://`
/// URI or other image URI) and `all_course_records`, a list of objects with
/// `index`, `name`, `strategy`, `hours` and `score`.
pub fn record_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<head>
    <style>
        body { font-family: 'Noto Sans SC', 'Helvetica'; font-size: 11pt; margin: 20mm; }
        h1 { font-size: 20pt; text-align: center; margin-bottom: 8mm; }
        table { width: 100%; border-collapse: collapse; }
        td, th { border: 1px solid #333333; padding: 4px; }
        th { background-color: #e2e8f0; }
        .avatar { width: 30mm; height: 40mm; }
    </style>
</head>
<body>
    <h1>Training Record</h1>
    <table>
        <tr>
            <th>Name</th><td>{{name}}</td>
            <th>ID</th><td>{{id_card}}</td>
            <td rowspan="4"><img class="avatar" src="{{{avatar}}}"/></td>
        </tr>
        <tr>
            <th>Category</th><td>{{category}}</td>
            <th>Position</th><td>{{position}}</td>
        </tr>
        <tr>
            <th>Education</th><td>{{education}}</td>
            <th>Major</th><td>{{major}}</td>
        </tr>
        <tr>
            <th>Company</th><td>{{company}}</td>
            <th>Company code</th><td>{{company_code}}</td>
        </tr>
    </table>

    <h2>Courses</h2>
    <table>
        <tr>
            <th>#</th><th>Course</th><th>Strategy</th><th>Hours</th><th>Score</th>
        </tr>
        {{#each all_course_records}}
        <tr>
            <td>{{index}}</td><td>{{name}}</td><td>{{strategy}}</td><td>{{hours}}</td><td>{{score}}</td>
        </tr>
        {{/each}}
    </table>
</body>
</html>
"##
}

/// One line of sample text per registered font family.
///
/// Merge keys: `font_families` (list of family names) and `sample`.
pub fn font_book_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<body>
    <h1>Font book</h1>
    {{#each font_families}}
    <p style="font-family: '{{this}}'">{{this}}: {{../sample}}</p>
    {{/each}}
</body>
</html>
"##
}

/// The same image at several device pixel ratios, side by side.
///
/// Merge keys: `images`, a list of objects with `label` and `src`.
pub fn scale_demo_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<body>
    <h1>Image scaling</h1>
    {{#each images}}
    <div>
        <p>{{label}}</p>
        <img src="{{{src}}}" style="width: 40mm; height: 40mm"/>
    </div>
    {{/each}}
</body>
</html>
"##
}

/// Minimal template for unit testing. Merge key: `name`.
pub fn minimal_template() -> &'static str {
    r#"<html><body><p>Hello {{name}}</p></body></html>"#
}
