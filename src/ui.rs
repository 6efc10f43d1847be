use crate::models::{JournalEntry, NoticeTone};
use crate::progress::CHALLENGE_DAYS;
use crate::session::{Phase, ViewSnapshot, REWARD_DURATION};

pub fn render_index(view: &ViewSnapshot) -> String {
    if view.phase == Phase::Loading {
        return fill_template(LOADING_HTML, |name| match name {
            "NOTICE" => Some(render_notice(view)),
            _ => None,
        });
    }

    let draft = &view.draft;
    fill_template(INDEX_HTML, |name| {
        let value = match name {
            "USER" => render_user(view),
            "NOTICE" => render_notice(view),
            "MODAL" => render_modal(view),
            "REWARD" => render_reward(view),
            "DAYS" => view.progress.days_completed.to_string(),
            "TOTAL" => view.progress.total_days.to_string(),
            "PERCENT" => format!("{:.2}", view.progress.percentage),
            "PERCENT_ROUNDED" => view.progress.rounded_percentage.to_string(),
            "CONGRATS" => render_congrats(view),
            "HABIT" => render_habit_banner(view),
            "DATE" => escape_html(&draft.date),
            "FOCUS" => escape_html(&draft.focus_score),
            "PRIORITY" => escape_html(&draft.top_priority),
            "SALES" => escape_html(&draft.sales_activity_count),
            "HABIT_CHECKED" => (if draft.core_habit_done { "checked" } else { "" }).to_owned(),
            "WIN" => escape_html(&draft.win_of_the_day),
            "LESSON" => escape_html(&draft.lesson_learned),
            "ENTRIES" => render_entries(&view.entries),
            _ => return None,
        };
        Some(value)
    })
}

/// Substitutes each `{{NAME}}` in `template` in a single pass, so inserted
/// text is never scanned for placeholders. Unknown names are left as is.
fn fill_template(template: &str, value: impl Fn(&str) -> Option<String>) -> String {
    let mut html = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        html.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        match value(&after[..end]) {
            Some(text) => html.push_str(&text),
            None => html.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }
    html.push_str(rest);
    html
}

fn render_user(view: &ViewSnapshot) -> String {
    match &view.user_id {
        Some(uid) => format!(
            r#"<p class="user">Your User ID: <span>{}</span></p>"#,
            escape_html(uid)
        ),
        None => String::new(),
    }
}

fn render_notice(view: &ViewSnapshot) -> String {
    match &view.notice {
        Some(notice) => {
            let tone = match notice.tone {
                NoticeTone::Success => "ok",
                NoticeTone::Error => "error",
            };
            format!(
                r#"<div class="notice" data-type="{tone}">{}</div>"#,
                escape_html(&notice.text)
            )
        }
        None => String::new(),
    }
}

fn render_modal(view: &ViewSnapshot) -> String {
    if !view.habit_setup_open {
        return String::new();
    }
    format!(
        r#"<div class="backdrop">
      <form class="modal" method="post" action="/habit">
        <h2>Define Your Core Habit</h2>
        <p>What is ONE single, consistent habit you commit to for the next {CHALLENGE_DAYS} days to boost your performance?</p>
        <input type="text" name="description" value="{}" placeholder="e.g., 'Make 10 cold calls before 9 AM'" autofocus />
        <button class="btn-primary" type="submit">Set My Core Habit</button>
      </form>
    </div>"#,
        escape_html(&view.habit_input)
    )
}

fn render_reward(view: &ViewSnapshot) -> String {
    if !view.reward_visible {
        return String::new();
    }
    format!(
        r#"<div class="reward" id="reward" data-duration="{}">
      <div class="burst">&#10024;&#128640;&#9989;</div>
      <p>Success!</p>
    </div>"#,
        REWARD_DURATION.as_millis()
    )
}

fn render_congrats(view: &ViewSnapshot) -> String {
    if !view.progress.challenge_complete {
        return String::new();
    }
    format!(
        r#"<p class="congrats">Congratulations! You've completed your {CHALLENGE_DAYS}-Day Jumpstart!<br />Ready for the next level?</p>"#
    )
}

fn render_habit_banner(view: &ViewSnapshot) -> String {
    match &view.core_habit {
        Some(habit) => format!(
            r#"<form class="habit" method="post" action="/habit/edit">
        Your Core Habit for {CHALLENGE_DAYS} Days: <strong>"{}"</strong>
        <button class="link" type="submit">Change</button>
      </form>"#,
            escape_html(habit)
        ),
        None => format!(
            r#"<form class="habit missing" method="post" action="/habit/edit">
        <button class="link" type="submit">Please click here to <strong>define your Core Habit</strong> for the {CHALLENGE_DAYS}-Day Jumpstart!</button>
      </form>"#
        ),
    }
}

fn render_entries(entries: &[JournalEntry]) -> String {
    if entries.is_empty() {
        return r#"<p class="hint">Start by adding your first daily log above!</p>"#.to_owned();
    }

    let mut html: String = entries
        .iter()
        .take(CHALLENGE_DAYS)
        .map(render_entry)
        .collect();
    if entries.len() > CHALLENGE_DAYS {
        html.push_str(&format!(
            r#"<p class="hint">Showing your most recent {CHALLENGE_DAYS} entries. Unlock the full 90-day journal for complete history and advanced insights!</p>"#
        ));
    }
    html
}

fn render_entry(entry: &JournalEntry) -> String {
    let score = entry.display_focus_score();
    let focus_class = match score {
        4.. => "good",
        3 => "fair",
        _ => "low",
    };
    let habit = if entry.core_habit_done {
        "&#9989; Yes!"
    } else {
        "&#10060; Not today"
    };

    format!(
        r#"<article class="entry">
        <div>
          <p class="entry-date">{date}</p>
          <p>Focus: <span class="focus {focus_class}">{score}/5</span></p>
          <p>Sales Activities: <span class="sales">{sales}</span></p>
        </div>
        <div class="entry-text">
          <p class="priority">Will Accomplish: {priority}</p>
          <p>Did Accomplish: {win}</p>
          <p>Lesson: {lesson}</p>
          <p class="done">Core Habit Done: {habit}</p>
        </div>
      </article>"#,
        date = escape_html(&entry.date),
        sales = entry.sales_activity_count,
        priority = escape_html(&entry.top_priority),
        win = escape_html(&entry.win_of_the_day),
        lesson = escape_html(&entry.lesson_learned),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const LOADING_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <meta http-equiv="refresh" content="2" />
  <title>Absolute Achievers</title>
  <style>
    body {
      margin: 0;
      min-height: 100vh;
      display: grid;
      place-items: center;
      background: #f3f4f6;
      font-family: "Inter", "Trebuchet MS", sans-serif;
      color: #374151;
    }
    .loading {
      font-size: 1.25rem;
      font-weight: 600;
      text-align: center;
    }
    .notice[data-type="error"] {
      margin-top: 12px;
      color: #b91c1c;
    }
  </style>
</head>
<body>
  <div class="loading">
    Loading Absolute Achievers Journal...
    {{NOTICE}}
  </div>
</body>
</html>
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Absolute Achievers</title>
  <style>
    :root {
      --blue-1: #1d4ed8;
      --blue-2: #1e3a8a;
      --ink: #1f2937;
      --accent: #2563eb;
      --good: #16a34a;
      --fair: #ca8a04;
      --low: #dc2626;
      --card: #ffffff;
      --shadow: 0 24px 60px rgba(30, 58, 138, 0.35);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(135deg, var(--blue-1), var(--blue-2));
      color: var(--ink);
      font-family: "Inter", "Trebuchet MS", sans-serif;
      padding: 24px 16px 48px;
    }

    .app {
      width: min(900px, 100%);
      margin: 0 auto;
      background: var(--card);
      border-radius: 20px;
      box-shadow: var(--shadow);
      padding: 32px;
      display: grid;
      gap: 24px;
    }

    header {
      text-align: center;
    }

    h1 {
      margin: 0 0 8px;
      font-size: clamp(1.9rem, 4vw, 2.4rem);
      color: var(--blue-2);
    }

    .subtitle {
      margin: 0;
      font-size: 1.2rem;
      color: var(--accent);
    }

    .user {
      margin: 8px 0 0;
      font-size: 0.85rem;
      color: #4b5563;
    }

    .user span {
      font-family: monospace;
      color: var(--accent);
      word-break: break-all;
    }

    .notice {
      padding: 12px;
      border-radius: 10px;
      text-align: center;
      font-weight: 500;
    }

    .notice[data-type="ok"] {
      background: #dcfce7;
      color: #15803d;
    }

    .notice[data-type="error"] {
      background: #fee2e2;
      color: #b91c1c;
    }

    .progress {
      background: #dbeafe;
      border-radius: 14px;
      padding: 20px;
      text-align: center;
    }

    .progress h2 {
      margin: 0 0 10px;
      font-size: 1.2rem;
      color: var(--blue-2);
    }

    .bar {
      height: 12px;
      border-radius: 999px;
      background: #e5e7eb;
      overflow: hidden;
      margin-bottom: 8px;
    }

    .bar div {
      height: 100%;
      background: #22c55e;
      border-radius: 999px;
      transition: width 500ms ease-out;
    }

    .congrats {
      font-weight: 600;
      color: #15803d;
    }

    .journal {
      background: linear-gradient(90deg, #eff6ff, #dbeafe);
      border-radius: 14px;
      padding: 24px;
    }

    .journal h2,
    .history h2 {
      margin: 0 0 16px;
      text-align: center;
      color: var(--blue-2);
    }

    .habit {
      text-align: center;
      font-size: 0.9rem;
      padding: 8px;
      border-radius: 10px;
      background: #bfdbfe;
      margin-bottom: 16px;
    }

    .habit.missing {
      background: #fee2e2;
      color: var(--low);
    }

    .link {
      appearance: none;
      border: none;
      background: none;
      color: inherit;
      text-decoration: underline;
      cursor: pointer;
      font: inherit;
    }

    .fields {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(260px, 1fr));
      gap: 16px;
    }

    .fields .wide {
      grid-column: 1 / -1;
    }

    label {
      display: block;
      font-size: 0.9rem;
      font-weight: 500;
      margin-bottom: 4px;
    }

    input[type="text"],
    input[type="date"],
    input[type="number"],
    textarea {
      width: 100%;
      padding: 10px;
      border: 1px solid #d1d5db;
      border-radius: 10px;
      font: inherit;
    }

    .check {
      display: flex;
      align-items: center;
      gap: 10px;
    }

    .btn-primary {
      appearance: none;
      border: none;
      border-radius: 12px;
      padding: 12px 28px;
      background: var(--accent);
      color: white;
      font-weight: 600;
      font-size: 1rem;
      cursor: pointer;
    }

    .submit {
      text-align: center;
      margin-top: 8px;
    }

    .history {
      border: 1px solid #e5e7eb;
      border-radius: 14px;
      padding: 24px;
      display: grid;
      gap: 14px;
    }

    .entry {
      display: flex;
      flex-wrap: wrap;
      justify-content: space-between;
      gap: 12px;
      background: linear-gradient(90deg, #f9fafb, #f3f4f6);
      border: 1px solid #e5e7eb;
      border-radius: 14px;
      padding: 16px;
    }

    .entry p {
      margin: 0 0 4px;
      font-size: 0.9rem;
    }

    .entry-date {
      font-size: 1.1rem !important;
      font-weight: 700;
      color: var(--accent);
    }

    .entry-text {
      flex: 1;
      text-align: right;
    }

    .focus {
      font-weight: 600;
    }

    .focus.good {
      color: var(--good);
    }

    .focus.fair {
      color: var(--fair);
    }

    .focus.low {
      color: var(--low);
    }

    .sales {
      font-weight: 600;
      color: #7e22ce;
    }

    .hint {
      margin: 0;
      text-align: center;
      font-style: italic;
      color: #6b7280;
    }

    .backdrop {
      position: fixed;
      inset: 0;
      background: rgba(0, 0, 0, 0.5);
      display: grid;
      place-items: center;
      padding: 16px;
      z-index: 50;
    }

    .modal {
      width: min(440px, 100%);
      background: white;
      border-radius: 16px;
      padding: 28px;
      text-align: center;
      display: grid;
      gap: 14px;
    }

    .modal h2 {
      margin: 0;
      color: var(--blue-2);
    }

    .reward {
      position: fixed;
      inset: 0;
      background: rgba(30, 58, 138, 0.75);
      display: grid;
      place-items: center;
      z-index: 60;
      color: white;
      animation: fade 3000ms ease forwards;
    }

    .reward .burst {
      font-size: 4rem;
      animation: bounce 800ms ease infinite;
    }

    .reward p {
      position: absolute;
      font-size: 1.6rem;
      font-weight: 700;
    }

    @keyframes bounce {
      50% {
        transform: translateY(-18px);
      }
    }

    @keyframes fade {
      0%, 85% {
        opacity: 1;
      }
      100% {
        opacity: 0;
        visibility: hidden;
      }
    }

    @media (max-width: 600px) {
      .app {
        padding: 22px 16px;
      }
      .entry-text {
        text-align: left;
      }
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Absolute Achievers</h1>
      <p class="subtitle">Your 21-Day Jumpstart to Elite Performance</p>
      {{USER}}
    </header>

    {{NOTICE}}
    {{MODAL}}

    <section class="progress">
      <h2>Challenge Progress: Day {{DAYS}} of {{TOTAL}}</h2>
      <div class="bar"><div style="width: {{PERCENT}}%"></div></div>
      <p>You've completed <strong>{{PERCENT_ROUNDED}}%</strong> of your Jumpstart! Keep going!</p>
      {{CONGRATS}}
    </section>

    <section class="journal">
      <h2>Daily Entry</h2>
      {{HABIT}}
      <form class="fields" method="post" action="/entries">
        <div>
          <label for="date">Date</label>
          <input type="date" id="date" name="date" value="{{DATE}}" required />
        </div>
        <div>
          <label for="focus">Focus Score (1-5)</label>
          <input type="number" id="focus" name="focus_score" value="{{FOCUS}}" min="1" max="5" placeholder="e.g., 4 (Good Focus)" required />
        </div>
        <div class="wide">
          <label for="topPriority">What I WILL Accomplish Today</label>
          <textarea id="topPriority" name="top_priority" rows="2" placeholder="Finish proposal for client X, Plan tomorrow's calls." required>{{PRIORITY}}</textarea>
        </div>
        <div>
          <label for="salesActivity">Key Sales Activity Count</label>
          <input type="number" id="salesActivity" name="sales_activity_count" value="{{SALES}}" min="0" placeholder="e.g., 20 (Calls Made)" required />
        </div>
        <div class="wide check">
          <input type="checkbox" id="habitDone" name="core_habit_done" {{HABIT_CHECKED}} />
          <label for="habitDone">Did I do my Core Habit?</label>
        </div>
        <div class="wide">
          <label for="win">What I DID Accomplish Today (My Win!)</label>
          <textarea id="win" name="win_of_the_day" rows="2" placeholder="Successfully handled a tough objection; Closed a small deal!" required>{{WIN}}</textarea>
        </div>
        <div class="wide">
          <label for="lesson">Lesson Learned / Insight</label>
          <textarea id="lesson" name="lesson_learned" rows="2" placeholder="Focusing on just one priority dramatically improved my efficiency." required>{{LESSON}}</textarea>
        </div>
        <div class="wide submit">
          <button class="btn-primary" type="submit">Save Daily Entry</button>
        </div>
      </form>
    </section>

    {{REWARD}}

    <section class="history">
      <h2>Your Recent Entries</h2>
      {{ENTRIES}}
    </section>
  </main>

  <script>
    const reward = document.getElementById('reward');
    if (reward) {
      setTimeout(() => reward.remove(), Number(reward.dataset.duration));
    }
  </script>
</body>
</html>
"#;
