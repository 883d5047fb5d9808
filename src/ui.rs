use crate::dashboard::DashboardSnapshot;
use crate::entry::EntryMode;
use crate::meal_list::{meal_rows, MealRows};
use crate::models::{DateFilter, MealEntryForm};
use crate::notices::Operation;
use crate::stats::{MacroSlice, StatsPanel};
use std::f64::consts::PI;
use std::fmt::Write;

pub fn render_login(error: Option<&str>) -> String {
    let error = error
        .map(|message| format!(r#"<div class="status" data-type="error">{}</div>"#, escape(message)))
        .unwrap_or_default();
    page("Calory Tracker", &LOGIN_HTML.replace("{{ERROR}}", &error))
}

pub fn render_dashboard(view: &DashboardSnapshot) -> String {
    let notice = view.notice.as_ref();
    let alert = notice
        .filter(|notice| notice.operation == Operation::Delete)
        .map(|notice| render_alert(&notice.message))
        .unwrap_or_default();
    let stale = notice
        .filter(|notice| matches!(notice.operation, Operation::Load | Operation::FilterChange))
        .map(|notice| render_stale(&notice.message))
        .unwrap_or_default();
    let entry_error = notice
        .filter(|notice| notice.operation == Operation::Create)
        .map(|notice| notice.message.as_str());
    let loading = if view.loading {
        r#"<div class="status" data-type="info">Loading...</div>"#
    } else {
        ""
    };

    let body = DASHBOARD_HTML
        .replace("{{USERNAME}}", &escape(&view.username))
        .replace("{{ALERT}}", &alert)
        .replace("{{STALE}}", &stale)
        .replace("{{LOADING}}", loading)
        .replace(
            "{{ENTRY}}",
            &render_entry(view.entry_mode, view.retained_entry.as_ref(), entry_error, view.submitting),
        )
        .replace("{{TABLE}}", &render_table(view))
        .replace("{{STATS}}", &render_stats(&StatsPanel::build(view.stats.as_ref())))
        .replace("{{MODAL}}", &view.confirming.map(render_modal).unwrap_or_default());
    page("Calory Tracker - Dashboard", &body)
}

fn render_alert(message: &str) -> String {
    format!(
        r#"<div class="alert" role="alert">
      <span>Error deleting meal: {}</span>
      <form method="post" action="/notices/dismiss"><button class="btn-ghost" type="submit">Dismiss</button></form>
    </div>"#,
        escape(message)
    )
}

fn render_stale(message: &str) -> String {
    format!(
        r#"<div class="hint stale">Could not refresh ({}). Showing last loaded data.
      <form method="post" action="/dashboard/refresh"><button class="btn-ghost" type="submit">Retry</button></form>
    </div>"#,
        escape(message)
    )
}

fn render_entry(
    mode: EntryMode,
    retained: Option<&MealEntryForm>,
    error: Option<&str>,
    submitting: bool,
) -> String {
    let empty = MealEntryForm::default();
    let values = retained.unwrap_or(&empty);
    let disabled = if submitting { " disabled" } else { "" };
    let focus = if error.is_some() { " autofocus" } else { "" };
    let error = error
        .map(|message| format!(r#"<div class="status" data-type="error">{}</div>"#, escape(message)))
        .unwrap_or_default();

    match mode {
        EntryMode::Manual => format!(
            r#"<h2>Add New Meal</h2>
      <form class="entry" method="post" action="/meals">
        <label for="title">Meal title</label>
        <input id="title" name="title" type="text" placeholder="e.g., Chicken salad" value="{title}" required{focus}{disabled} />
        <div class="macro-inputs">
          <label>Carbs (g)<input id="carbs" name="carbs" inputmode="decimal" value="{carbs}"{disabled} /></label>
          <label>Proteins (g)<input id="proteins" name="proteins" inputmode="decimal" value="{proteins}"{disabled} /></label>
          <label>Fats (g)<input id="fats" name="fats" inputmode="decimal" value="{fats}"{disabled} /></label>
          <label>Calories<input id="calories" name="calories" inputmode="decimal" value="{calories}"{disabled} /></label>
        </div>
        {error}
        <button class="btn-primary" type="submit"{disabled}>{label}</button>
      </form>"#,
            title = escape(&values.title),
            carbs = escape(&values.carbs),
            proteins = escape(&values.proteins),
            fats = escape(&values.fats),
            calories = escape(&values.calories),
            label = if submitting { "Adding..." } else { "Add Meal" },
        ),
        EntryMode::Ai => format!(
            r#"<h2>Add New Meal</h2>
      <p class="subtitle">Describe your meal and AI will calculate the macros for you</p>
      <form class="entry" method="post" action="/meals">
        <label for="description">What did you eat?</label>
        <textarea id="description" name="description" rows="4" placeholder="e.g., Two scrambled eggs with whole wheat toast and a glass of orange juice" required{focus}{disabled}>{description}</textarea>
        {error}
        <button class="btn-primary" type="submit"{disabled}>{label}</button>
      </form>"#,
            description = escape(&values.description),
            label = if submitting { "Processing..." } else { "Add Meal with AI" },
        ),
    }
}

fn render_table(view: &DashboardSnapshot) -> String {
    let mut options = String::new();
    for filter in [DateFilter::Today, DateFilter::AllTime] {
        let selected = if filter == view.date_filter { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{}"{selected}>{}</option>"#,
            filter.as_query(),
            filter.label()
        );
    }

    let body = match meal_rows(&view.meals, &view.deleting) {
        MealRows::Placeholder => {
            r#"<tr><td class="placeholder" colspan="7">No meals found. Add your first meal above!</td></tr>"#
                .to_string()
        }
        MealRows::Rows(rows) => rows
            .iter()
            .map(|row| {
                let (disabled, label) = if row.deleting {
                    (" disabled", "Deleting...")
                } else {
                    ("", "Delete")
                };
                format!(
                    r#"<tr>
            <td class="title">{title}</td><td>{carbs}</td><td>{proteins}</td><td>{fats}</td><td>{calories}</td><td>{created}</td>
            <td><form method="post" action="/meals/{id}/delete"><button class="btn-danger-link" type="submit"{disabled}>{label}</button></form></td>
          </tr>"#,
                    title = escape(&row.title),
                    carbs = row.carbs,
                    proteins = row.proteins,
                    fats = row.fats,
                    calories = row.total_calories,
                    created = escape(&row.created),
                    id = row.id,
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };

    format!(
        r#"<div class="table-header">
        <h2>Your Meals</h2>
        <form method="post" action="/dashboard/filter">
          <select name="date_filter" aria-label="Date filter" onchange="this.form.submit()">{options}</select>
          <noscript><button class="btn-ghost" type="submit">Apply</button></noscript>
        </form>
      </div>
      <table>
        <thead><tr><th>Meal</th><th>Carbs (g)</th><th>Proteins (g)</th><th>Fats (g)</th><th>Calories</th><th>Date</th><th>Actions</th></tr></thead>
        <tbody>
          {body}
        </tbody>
      </table>"#
    )
}

fn render_modal(id: i64) -> String {
    format!(
        r#"<div class="modal-backdrop">
    <div class="modal" role="dialog" aria-modal="true">
      <h3>Delete Meal</h3>
      <p>Are you sure you want to delete this meal? This action cannot be undone.</p>
      <div class="modal-actions">
        <form method="post" action="/meals/{id}/delete/cancel"><button class="btn-ghost" type="submit">Cancel</button></form>
        <form method="post" action="/meals/{id}/delete/confirm"><button class="btn-danger" type="submit">Delete</button></form>
      </div>
    </div>
  </div>"#
    )
}

fn render_stats(panel: &StatsPanel) -> String {
    let content = match panel {
        StatsPanel::Loading => r#"<div class="placeholder">Loading...</div>"#.to_string(),
        StatsPanel::Empty => r#"<div class="placeholder">
        <p>No meals logged today.</p>
        <p class="hint">Add your first meal to see your stats!</p>
      </div>"#
            .to_string(),
        StatsPanel::Summary(summary) => {
            let chart = match &summary.breakdown {
                Some(slices) => render_pie(slices),
                None => r#"<div class="placeholder">No macro data to display</div>"#.to_string(),
            };
            format!(
                r#"<div class="panel">
        <div class="stat"><span class="value carbs">{carbs}</span><span class="label">Carbs (g)</span></div>
        <div class="stat"><span class="value proteins">{proteins}</span><span class="label">Proteins (g)</span></div>
        <div class="stat"><span class="value fats">{fats}</span><span class="label">Fats (g)</span></div>
        <div class="stat"><span class="value calories">{calories}</span><span class="label">Calories</span></div>
      </div>
      <div class="stat count">
        <span class="value">{count}</span>
        <span class="label">{date}</span>
      </div>
      <h3>Macro Distribution</h3>
      {chart}"#,
                carbs = summary.carbs,
                proteins = summary.proteins,
                fats = summary.fats,
                calories = summary.calories,
                count = summary.meal_count,
                date = escape(&summary.date),
            )
        }
    };
    format!("<h2>Today's Summary</h2>\n      {content}")
}

fn render_pie(slices: &[MacroSlice]) -> String {
    const CENTER: f64 = 120.0;
    const RADIUS: f64 = 90.0;

    let total: f64 = slices.iter().map(|slice| slice.grams).sum();
    let point = |angle: f64, radius: f64| {
        (
            CENTER + radius * angle.cos(),
            CENTER + radius * angle.sin(),
        )
    };

    let mut shapes = String::new();
    let mut labels = String::new();
    let mut start = -PI / 2.0;
    for slice in slices {
        let sweep = slice.grams / total * 2.0 * PI;
        let end = start + sweep;
        let color = slice.nutrient.color();

        if slices.len() == 1 {
            let _ = write!(
                shapes,
                r#"<circle cx="{CENTER}" cy="{CENTER}" r="{RADIUS}" fill="{color}" />"#
            );
        } else {
            let (x1, y1) = point(start, RADIUS);
            let (x2, y2) = point(end, RADIUS);
            let large_arc = u8::from(sweep > PI);
            let _ = write!(
                shapes,
                r#"<path d="M {CENTER} {CENTER} L {x1:.2} {y1:.2} A {RADIUS} {RADIUS} 0 {large_arc} 1 {x2:.2} {y2:.2} Z" fill="{color}" />"#
            );
        }

        if slice.percentage >= 10.0 {
            let (x, y) = point(start + sweep / 2.0, RADIUS * 0.5);
            let _ = write!(
                labels,
                r#"<text class="chart-label" x="{x:.2}" y="{y:.2}" text-anchor="middle" dominant-baseline="central">{:.1}%</text>"#,
                slice.percentage
            );
        }
        start = end;
    }

    let legend = slices
        .iter()
        .map(|slice| {
            format!(
                r#"<li><span class="swatch" style="background: {}"></span>{}: {}g ({:.1}%)</li>"#,
                slice.nutrient.color(),
                slice.nutrient.name(),
                slice.grams,
                slice.percentage
            )
        })
        .collect::<Vec<_>>()
        .join("");

    format!(
        r#"<svg id="chart" viewBox="0 0 240 240" role="img" aria-label="Macro distribution">{shapes}{labels}</svg>
      <ul class="legend">{legend}</ul>"#
    )
}

fn page(title: &str, body: &str) -> String {
    PAGE_HTML
        .replace("{{TITLE}}", title)
        .replace("{{BODY}}", body)
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            // keeps user text from matching a later template placeholder
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(ch),
        }
    }
    out
}

const LOGIN_HTML: &str = r#"<main class="app narrow">
    <header>
      <h1>Calory Tracker</h1>
      <p class="subtitle">Track your meals and macros.</p>
    </header>
    <form class="entry" method="post" action="/login">
      <label for="username">Username</label>
      <input id="username" name="username" type="text" placeholder="Enter your username" required autofocus />
      {{ERROR}}
      <button class="btn-primary" type="submit">Sign in</button>
    </form>
  </main>"#;

const DASHBOARD_HTML: &str = r#"<main class="app">
    <header class="top">
      <div>
        <h1>Calory Tracker</h1>
        <p class="subtitle">Welcome, {{USERNAME}}</p>
      </div>
      <form method="post" action="/logout"><button class="btn-ghost" type="submit">Logout</button></form>
    </header>
    {{ALERT}}
    {{STALE}}
    {{LOADING}}
    <div class="layout">
      <div class="main-column">
        <section class="card">
      {{ENTRY}}
        </section>
        <section class="card">
      {{TABLE}}
        </section>
      </div>
      <section class="card" data-testid="stats-section">
      {{STATS}}
      </section>
    </div>
  </main>
  {{MODAL}}"#;

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg-1: #f3f6f1;
      --bg-2: #d9ead3;
      --ink: #2b2a28;
      --accent: #2563eb;
      --danger: #dc2626;
      --card: rgba(255, 255, 255, 0.9);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.14);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #eef5ea 60%, #f9faf7 100%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1100px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 24px;
      animation: rise 600ms ease;
    }

    .app.narrow {
      width: min(420px, 100%);
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
    }

    header.top {
      display: flex;
      justify-content: space-between;
      align-items: center;
    }

    h1 {
      font-family: "Georgia", serif;
      font-size: clamp(2rem, 4vw, 2.6rem);
      margin: 0;
    }

    h2 {
      font-size: 1.15rem;
      margin: 0 0 12px;
    }

    .subtitle {
      margin: 0;
      color: #5f5c57;
    }

    .layout {
      display: grid;
      grid-template-columns: 2fr 1fr;
      gap: 24px;
      align-items: start;
    }

    .main-column {
      display: grid;
      gap: 24px;
    }

    .card {
      background: var(--card);
      border-radius: 20px;
      box-shadow: var(--shadow);
      padding: 24px;
      overflow-x: auto;
    }

    .entry {
      display: grid;
      gap: 10px;
    }

    .macro-inputs {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(120px, 1fr));
      gap: 10px;
    }

    .macro-inputs label {
      display: grid;
      gap: 4px;
      font-size: 0.85rem;
    }

    input, textarea, select {
      font: inherit;
      padding: 8px 10px;
      border-radius: 10px;
      border: 1px solid rgba(47, 72, 88, 0.2);
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
    }

    button:disabled {
      opacity: 0.5;
      cursor: not-allowed;
    }

    .btn-primary {
      background: var(--accent);
      color: white;
    }

    .btn-danger {
      background: var(--danger);
      color: white;
    }

    .btn-ghost {
      background: white;
      border: 1px solid rgba(47, 72, 88, 0.2);
    }

    .btn-danger-link {
      background: none;
      color: var(--danger);
      padding: 0;
    }

    .table-header {
      display: flex;
      justify-content: space-between;
      align-items: center;
      margin-bottom: 12px;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 0.9rem;
    }

    th, td {
      text-align: left;
      padding: 10px 8px;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
    }

    th {
      font-size: 0.75rem;
      text-transform: uppercase;
      letter-spacing: 0.08em;
      color: #8b857d;
    }

    .placeholder {
      text-align: center;
      color: #8b857d;
      padding: 18px;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(2, 1fr);
      gap: 12px;
    }

    .stat {
      background: white;
      border-radius: 16px;
      padding: 14px;
      display: grid;
      gap: 4px;
      text-align: center;
    }

    .stat.count {
      margin-top: 12px;
    }

    .stat .label {
      font-size: 0.8rem;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.5rem;
      font-weight: 600;
    }

    .value.carbs { color: #3B82F6; }
    .value.proteins { color: #10B981; }
    .value.fats { color: #F59E0B; }
    .value.calories { color: var(--danger); }

    #chart {
      width: 100%;
      max-height: 240px;
    }

    .chart-label {
      fill: white;
      font-size: 12px;
      font-weight: 600;
    }

    .legend {
      list-style: none;
      padding: 0;
      display: grid;
      gap: 4px;
      font-size: 0.85rem;
    }

    .swatch {
      display: inline-block;
      width: 10px;
      height: 10px;
      border-radius: 3px;
      margin-right: 6px;
    }

    .status {
      font-size: 0.9rem;
      padding: 8px 12px;
      border-radius: 10px;
    }

    .status[data-type="error"] {
      background: #fef2f2;
      color: var(--danger);
    }

    .status[data-type="info"] {
      background: #eff6ff;
      color: var(--accent);
    }

    .alert {
      display: flex;
      justify-content: space-between;
      align-items: center;
      background: #fef2f2;
      color: var(--danger);
      border: 1px solid #fecaca;
      border-radius: 14px;
      padding: 10px 16px;
    }

    .hint {
      font-size: 0.85rem;
      color: #8b857d;
    }

    .stale {
      display: flex;
      gap: 12px;
      align-items: center;
    }

    .modal-backdrop {
      position: fixed;
      inset: 0;
      background: rgba(43, 42, 40, 0.45);
      display: grid;
      place-items: center;
    }

    .modal {
      background: white;
      border-radius: 18px;
      padding: 24px;
      width: min(380px, 90vw);
      text-align: center;
    }

    .modal-actions {
      display: flex;
      justify-content: center;
      gap: 12px;
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(12px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @media (max-width: 800px) {
      .layout {
        grid-template-columns: 1fr;
      }
    }
  </style>
</head>
<body>
  {{BODY}}
</body>
</html>
"#;
