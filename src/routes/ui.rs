use axum::{response::Html, routing::get, Router};

pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Ask your CSV</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 0; color: #1d1d1f; display: flex; min-height: 100vh; }
    aside { width: 280px; padding: 1.5rem; background: linear-gradient(#2E7D32, #A5D6A7); color: white; }
    main { flex: 1; padding: 2rem; overflow: auto; }
    h1 { font-size: 42px; color: #4CAF50; margin-top: 0; }
    .card { border: 1px solid #ddd; padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }
    .hidden { display: none; }
    .error { color: #b00020; font-weight: 600; }
    label { display: block; margin-top: 0.75rem; font-weight: 600; }
    input[type=text], select { width: 100%; padding: 0.5rem; box-sizing: border-box; }
    button:disabled { opacity: 0.5; cursor: wait; }
    button { margin-top: 1rem; padding: 0.6rem 1rem; background: #4CAF50; color: white; border: 0; border-radius: 4px; font-size: 16px; }
    table { border-collapse: collapse; width: 100%; }
    th, td { border: 1px solid #ddd; padding: 0.35rem 0.6rem; text-align: left; }
    th { background: #f6f8fa; }
    #answer { white-space: pre-wrap; }
  </style>
</head>
<body>
  <aside>
    <h2>Upload and Ask</h2>
    <label for="fileInput">Upload your CSV file</label>
    <input id="fileInput" type="file" accept=".csv,text/csv" />
    <button id="uploadBtn">Upload</button>
    <div id="uploadStatus"></div>
  </aside>

  <main>
    <h1>ASK YOUR CSV</h1>
    <div id="error" class="error"></div>

    <div id="previewCard" class="card hidden">
      <h3>Preview of your data:</h3>
      <div id="preview"></div>
    </div>

    <div id="questionCard" class="card hidden">
      <label for="question">Ask a question about your CSV</label>
      <input id="question" type="text" />
      <button id="askBtn">Ask</button>
    </div>

    <div id="answerCard" class="card hidden">
      <h3>Response</h3>
      <div id="answer"></div>
    </div>

    <div id="chartCard" class="card hidden">
      <div id="selects"></div>
      <div id="chart"></div>
    </div>
  </main>

  <script>
    let session = null;
    const $ = (id) => document.getElementById(id);

    function showError(json) {
      $('error').textContent = json && json.details ? json.details : '';
    }

    async function call(url, options) {
      const res = await fetch(url, options);
      const json = await res.json();
      if (!res.ok) {
        showError(json);
        return null;
      }
      showError(null);
      return json;
    }

    function renderPreview(view) {
      const head = view.preview.columns.map(c => `<th>${escape(c)}</th>`).join('');
      const rows = view.preview.rows
        .map(r => `<tr>${r.map(v => `<td>${v === null ? '' : escape(String(v))}</td>`).join('')}</tr>`)
        .join('');
      $('preview').innerHTML = `<table><thead><tr>${head}</tr></thead><tbody>${rows}</tbody></table>`;
      $('previewCard').classList.remove('hidden');
      $('questionCard').classList.remove('hidden');
    }

    function renderView(view) {
      session = view;
      $('answerCard').classList.toggle('hidden', !view.answer);
      $('answer').textContent = view.answer || '';
      $('chart').innerHTML = '';
      $('selects').innerHTML = '';
      $('chartCard').classList.toggle('hidden', !view.chart);
      if (!view.chart) return;

      for (const prompt of view.chart.prompts) {
        const options = prompt.options.map(o => `<option>${escape(o)}</option>`).join('');
        $('selects').insertAdjacentHTML('beforeend',
          `<label>${escape(prompt.label)}</label><select data-key="${prompt.key}">${options}</select>`);
      }
      $('selects').querySelectorAll('select').forEach(s => s.addEventListener('change', drawChart));
      drawChart();
    }

    async function drawChart() {
      const selection = {};
      $('selects').querySelectorAll('select').forEach(s => { selection[s.dataset.key] = s.value; });
      const json = await call(`/api/sessions/${session.session_id}/chart`, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(selection)
      });
      if (json) {
        session.revision = json.revision;
        $('chart').innerHTML = json.svg;
      }
    }

    function escape(s) {
      return s.replace(/[&<>"]/g, c => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;' }[c]));
    }

    $('uploadBtn').addEventListener('click', async () => {
      const fileInput = $('fileInput');
      if (!fileInput.files.length) {
        $('uploadStatus').textContent = 'Select a file first.';
        return;
      }
      const formData = new FormData();
      formData.append('file', fileInput.files[0]);
      $('uploadStatus').textContent = 'Uploading...';
      const view = await call('/api/sessions', { method: 'POST', body: formData });
      $('uploadStatus').textContent = view ? `${view.row_count} rows loaded` : '';
      if (view) {
        renderPreview(view);
        renderView(view);
      }
    });

    $('askBtn').addEventListener('click', async () => {
      const askBtn = $('askBtn');
      if (!session || askBtn.disabled) return;
      askBtn.disabled = true;
      $('answer').textContent = 'Thinking...';
      $('answerCard').classList.remove('hidden');
      try {
        const view = await call(`/api/sessions/${session.session_id}/question`, {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ question: $('question').value })
        });
        if (view) renderView(view);
      } finally {
        askBtn.disabled = false;
      }
    });
  </script>
</body>
</html>"#)
}
