use std::fmt::Write;

use crate::k8s::cache::View;
use crate::record::Source;

pub fn page(view: &View) -> String {
	let mut rows = String::new();
	for r in view.records.iter() {
		let _ = write!(
			rows,
			"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td></tr>",
			escape(&r.name),
			escape(&r.namespace),
			escape(&r.hostname),
			escape(&r.ingress_class),
			r.status.as_str().to_lowercase(),
			r.status,
			escape(&r.creation_timestamp),
		);
	}

	let notice_hidden = match view.source {
		Source::Live => " hidden",
		Source::Mock => "",
	};

	format!(
		r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Ingress resources</title></head>
<body>
<h1>Ingress resources</h1>
<p id="notice" class="notice"{notice_hidden}>Cluster data unavailable, showing placeholder entries.</p>
<table>
<thead><tr><th>Name</th><th>Namespace</th><th>Hostname</th><th>Class</th><th>Status</th><th>Created</th></tr></thead>
<tbody id="rows">
{rows}
</tbody>
</table>
<p>Fetched at <span id="fetched-at">{fetched_at}</span></p>
<script>{SCRIPT}</script>
</body>
</html>
"#,
		fetched_at = view.fetched_at_rfc3339(),
	)
}

/// Keeps the table current from `ingresses_update` events. A page opened with query filters asks
/// for its own filtered view whenever an unfiltered push arrives.
const SCRIPT: &str = r#"
const filters = Object.fromEntries(new URLSearchParams(location.search));
const filtered = Object.keys(filters).length > 0;
let awaiting = false;
const ws = new WebSocket(`${location.protocol === "https:" ? "wss" : "ws"}://${location.host}/ws`);
ws.onmessage = (message) => {
	const update = JSON.parse(message.data);
	if (update.event !== "ingresses_update") return;
	if (filtered && !awaiting) {
		awaiting = true;
		ws.send(JSON.stringify({ event: "get_ingresses", filters }));
		return;
	}
	awaiting = false;
	render(update);
};
function render(update) {
	const rows = document.getElementById("rows");
	rows.replaceChildren(...update.data.map((r) => {
		const tr = document.createElement("tr");
		for (const value of [r.name, r.namespace, r.hostname, r.ingress_class, r.status, r.creation_timestamp]) {
			const td = document.createElement("td");
			td.textContent = value;
			tr.appendChild(td);
		}
		tr.children[4].className = r.status.toLowerCase();
		return tr;
	}));
	document.getElementById("fetched-at").textContent = update.fetched_at;
	document.getElementById("notice").hidden = update.source !== "mock";
}
"#;

fn escape(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for c in s.chars() {
		match c {
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			c => out.push(c),
		}
	}
	out
}
