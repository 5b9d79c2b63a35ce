//! Deterministic offline fallback.
//!
//! The last ladder rung never calls out: it picks a scaffold template from
//! keywords in the request and stamps in a sanitized title. Every template
//! passes validation with zero errors, which is what lets the ladder promise
//! it never fails.

use crate::extract::ExtractionResult;
use crate::files::GeneratedFile;

/// Scaffold families the fallback can synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaffoldKind {
    Form,
    List,
    Dashboard,
    Table,
    Counter,
    Profile,
    Generic,
}

impl ScaffoldKind {
    pub const ALL: [ScaffoldKind; 7] = [
        ScaffoldKind::Form,
        ScaffoldKind::List,
        ScaffoldKind::Dashboard,
        ScaffoldKind::Table,
        ScaffoldKind::Counter,
        ScaffoldKind::Profile,
        ScaffoldKind::Generic,
    ];

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            ScaffoldKind::Form => &[
                "form", "login", "signup", "sign up", "contact", "register", "subscribe",
            ],
            ScaffoldKind::List => &["todo", "task", "checklist", "list"],
            ScaffoldKind::Dashboard => &["dashboard", "analytics", "stats", "metrics"],
            ScaffoldKind::Table => &["table", "pricing", "plans", "comparison"],
            ScaffoldKind::Counter => &["counter", "clicker", "stopwatch", "timer"],
            ScaffoldKind::Profile => &["profile", "avatar", "bio", "card"],
            ScaffoldKind::Generic => &[],
        }
    }
}

impl std::fmt::Display for ScaffoldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaffoldKind::Form => write!(f, "form"),
            ScaffoldKind::List => write!(f, "list"),
            ScaffoldKind::Dashboard => write!(f, "dashboard"),
            ScaffoldKind::Table => write!(f, "table"),
            ScaffoldKind::Counter => write!(f, "counter"),
            ScaffoldKind::Profile => write!(f, "profile"),
            ScaffoldKind::Generic => write!(f, "generic"),
        }
    }
}

/// Pick a scaffold family from request keywords, first match wins.
pub fn classify(request: &str) -> ScaffoldKind {
    let lower = request.to_lowercase();
    for kind in ScaffoldKind::ALL {
        if kind.keywords().iter().any(|kw| lower.contains(kw)) {
            return kind;
        }
    }
    ScaffoldKind::Generic
}

/// Synthesize a guaranteed-valid scaffold for the request. Pure function of
/// the request text.
pub fn synthesize(request: &str) -> ExtractionResult {
    let kind = classify(request);
    let source = template(kind).replace("__TITLE__", &title_from(request));
    let explanation = format!("Offline scaffold: selected the {kind} layout from request keywords.");
    ExtractionResult::synthesized(
        vec![GeneratedFile::new("src/App.jsx", source)],
        Some(explanation),
    )
}

/// Reduce the request to a short display title. Only letters, digits and
/// spaces survive, so the result can be stamped into markup verbatim.
fn title_from(request: &str) -> String {
    let cleaned: String = request
        .chars()
        .map(|c| if c.is_alphanumeric() || c == ' ' { c } else { ' ' })
        .collect();
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    words.truncate(7);
    let title = words.join(" ");
    if title.is_empty() {
        "Generated Component".to_string()
    } else {
        let mut chars = title.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => title,
        }
    }
}

fn template(kind: ScaffoldKind) -> &'static str {
    match kind {
        ScaffoldKind::Form => FORM_TEMPLATE,
        ScaffoldKind::List => LIST_TEMPLATE,
        ScaffoldKind::Dashboard => DASHBOARD_TEMPLATE,
        ScaffoldKind::Table => TABLE_TEMPLATE,
        ScaffoldKind::Counter => COUNTER_TEMPLATE,
        ScaffoldKind::Profile => PROFILE_TEMPLATE,
        ScaffoldKind::Generic => GENERIC_TEMPLATE,
    }
}

const FORM_TEMPLATE: &str = r#"function App() {
  const [values, setValues] = React.useState({ name: '', email: '' });
  const [submitted, setSubmitted] = React.useState(false);
  const update = (field) => (event) =>
    setValues({ ...values, [field]: event.target.value });
  const handleSubmit = (event) => {
    event.preventDefault();
    setSubmitted(true);
  };
  if (submitted) {
    return (
      <div className="p-6 rounded-lg border shadow-sm max-w-md">
        <h2 className="text-xl font-semibold">Thanks, {values.name || 'friend'}!</h2>
        <p className="mt-2">Your details were received.</p>
        <button className="mt-4 px-4 py-2 rounded border" onClick={() => setSubmitted(false)}>
          Send another
        </button>
      </div>
    );
  }
  return (
    <form className="p-6 rounded-lg border shadow-sm max-w-md" onSubmit={handleSubmit}>
      <h1 className="text-xl font-semibold">__TITLE__</h1>
      <label className="block mt-4" htmlFor="name">Name</label>
      <input id="name" className="w-full mt-1 px-3 py-2 rounded border" value={values.name} onChange={update('name')} placeholder="Ada Lovelace" />
      <label className="block mt-4" htmlFor="email">Email</label>
      <input id="email" type="email" className="w-full mt-1 px-3 py-2 rounded border" value={values.email} onChange={update('email')} placeholder="ada@example.com" />
      <button type="submit" className="mt-6 px-4 py-2 rounded border font-semibold w-full">
        Submit
      </button>
    </form>
  );
}
export default App;
"#;

const LIST_TEMPLATE: &str = r#"function App() {
  const [items, setItems] = React.useState([
    { id: 1, label: 'Review the draft', done: true },
    { id: 2, label: 'Ship the update', done: false },
  ]);
  const [draft, setDraft] = React.useState('');
  const addItem = (event) => {
    event.preventDefault();
    if (!draft.trim()) return;
    setItems([...items, { id: Date.now(), label: draft.trim(), done: false }]);
    setDraft('');
  };
  const toggle = (id) =>
    setItems(items.map((item) => (item.id === id ? { ...item, done: !item.done } : item)));
  return (
    <div className="p-6 rounded-lg border shadow-sm max-w-md">
      <h1 className="text-xl font-semibold">__TITLE__</h1>
      <form className="flex gap-2 mt-4" onSubmit={addItem}>
        <input
          className="flex-1 px-3 py-2 rounded border"
          value={draft}
          onChange={(event) => setDraft(event.target.value)}
          placeholder="Add an item"
        />
        <button type="submit" className="px-4 py-2 rounded border font-semibold">
          Add
        </button>
      </form>
      <ul className="mt-4">
        {items.map((item) => (
          <li key={item.id} className="flex items-center gap-2 py-2 border-b">
            <input
              type="checkbox"
              id={'item-' + item.id}
              checked={item.done}
              onChange={() => toggle(item.id)}
            />
            <span className={item.done ? 'line-through' : ''}>{item.label}</span>
          </li>
        ))}
      </ul>
    </div>
  );
}
export default App;
"#;

const DASHBOARD_TEMPLATE: &str = r#"function App() {
  const stats = [
    { label: 'Active users', value: '1,284', delta: 'up 12%' },
    { label: 'Sessions', value: '5,431', delta: 'up 4%' },
    { label: 'Conversion', value: '3.9%', delta: 'down 1%' },
    { label: 'Revenue', value: '$12,400', delta: 'up 8%' },
  ];
  return (
    <div className="p-6">
      <h1 className="text-xl font-semibold">__TITLE__</h1>
      <div className="grid grid-cols-2 gap-4 mt-4">
        {stats.map((stat) => (
          <div key={stat.label} className="p-4 rounded-lg border shadow-sm">
            <p className="text-sm">{stat.label}</p>
            <p className="text-2xl font-semibold mt-1">{stat.value}</p>
            <span className="text-sm mt-1">{stat.delta} this week</span>
          </div>
        ))}
      </div>
    </div>
  );
}
export default App;
"#;

const TABLE_TEMPLATE: &str = r#"function App() {
  const [selected, setSelected] = React.useState('Starter');
  const tiers = [
    { name: 'Starter', price: '$0', features: ['1 project', 'Community support'] },
    { name: 'Team', price: '$12', features: ['10 projects', 'Priority support'] },
    { name: 'Scale', price: '$49', features: ['Unlimited projects', 'Dedicated support'] },
  ];
  return (
    <div className="p-6">
      <h1 className="text-xl font-semibold">__TITLE__</h1>
      <div className="grid grid-cols-3 gap-4 mt-4">
        {tiers.map((tier) => (
          <div key={tier.name} className="p-4 rounded-lg border shadow-sm flex flex-col">
            <h2 className="font-semibold">{tier.name}</h2>
            <p className="text-2xl font-semibold mt-1">{tier.price}</p>
            <ul className="mt-2 flex-1">
              {tier.features.map((feature) => (
                <li key={feature} className="text-sm py-1">{feature}</li>
              ))}
            </ul>
            <button
              className="mt-4 px-4 py-2 rounded border font-semibold"
              onClick={() => setSelected(tier.name)}
            >
              {selected === tier.name ? 'Selected' : 'Choose ' + tier.name}
            </button>
          </div>
        ))}
      </div>
    </div>
  );
}
export default App;
"#;

const COUNTER_TEMPLATE: &str = r#"function App() {
  const [count, setCount] = React.useState(0);
  return (
    <div className="p-6 rounded-lg border shadow-sm max-w-xs text-center">
      <h1 className="text-xl font-semibold">__TITLE__</h1>
      <p className="text-4xl font-semibold mt-4">{count}</p>
      <div className="flex gap-2 mt-4 justify-center">
        <button className="px-4 py-2 rounded border" onClick={() => setCount(count - 1)}>
          Decrease
        </button>
        <button className="px-4 py-2 rounded border" onClick={() => setCount(0)}>
          Reset
        </button>
        <button className="px-4 py-2 rounded border" onClick={() => setCount(count + 1)}>
          Increase
        </button>
      </div>
    </div>
  );
}
export default App;
"#;

const PROFILE_TEMPLATE: &str = r#"function App() {
  const [following, setFollowing] = React.useState(false);
  return (
    <div className="p-6 rounded-lg border shadow-sm max-w-sm">
      <div className="flex items-center gap-4">
        <div className="w-12 h-12 rounded-full border flex items-center justify-center font-semibold">
          AL
        </div>
        <div>
          <h1 className="text-xl font-semibold">__TITLE__</h1>
          <p className="text-sm">Product designer</p>
        </div>
      </div>
      <p className="mt-4">Designing calm interfaces and writing about the craft.</p>
      <div className="flex gap-2 mt-4">
        <button
          className="px-4 py-2 rounded border font-semibold"
          onClick={() => setFollowing(!following)}
        >
          {following ? 'Following' : 'Follow'}
        </button>
        <button className="px-4 py-2 rounded border">Message</button>
      </div>
    </div>
  );
}
export default App;
"#;

const GENERIC_TEMPLATE: &str = r#"function App() {
  const [open, setOpen] = React.useState(false);
  return (
    <div className="p-6 rounded-lg border shadow-sm max-w-md">
      <h1 className="text-xl font-semibold">__TITLE__</h1>
      <p className="mt-2">A starting point generated from your request.</p>
      <button className="mt-4 px-4 py-2 rounded border font-semibold" onClick={() => setOpen(!open)}>
        {open ? 'Hide details' : 'Show details'}
      </button>
      {open && (
        <p className="mt-4 text-sm">
          Replace this scaffold with the layout you had in mind, or refine the
          request and generate again.
        </p>
      )}
    </div>
  );
}
export default App;
"#;
