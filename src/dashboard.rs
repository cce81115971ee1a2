use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::logok;

pub const INDEX_FILE: &str = "index.html";

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>PUBG Shorts Bot</title>
    <style>
        body{background:#1a1a2e;color:#fff;font-family:Arial;padding:20px}
        .container{max-width:800px;margin:0 auto;background:#16213e;padding:30px;border-radius:20px}
        h1{color:gold;text-align:center}
        .badge{background:linear-gradient(135deg,#667eea,#764ba2);padding:5px 15px;border-radius:20px;display:inline-block;margin-bottom:15px}
        button{padding:10px 20px;margin:5px;border:none;border-radius:5px;cursor:pointer}
        .mode-auto{background:#ffab00}
        .mode-manual{background:#00d25b;color:#fff}
        .active{border:3px solid #fff}
        .run-btn{background:#667eea;color:#fff;font-size:20px;padding:15px;width:100%}
        .run-btn:disabled{background:#444;cursor:not-allowed}
        .status{background:#0f3460;padding:20px;border-radius:10px;margin:20px 0}
        .progress{background:#1a1a2e;border-radius:5px;height:10px;margin-top:10px}
        .bar{background:gold;height:10px;border-radius:5px;width:0;transition:width .5s}
        .topic{background:#1a1a2e;padding:10px;border-left:4px solid gold;margin:10px 0}
        .stats{display:grid;grid-template-columns:repeat(5,1fr);gap:10px;margin:20px 0}
        .stat{background:#0f3460;padding:10px;text-align:center}
        .number{font-size:24px;color:gold}
        .logs{background:#0f3460;padding:10px;max-height:200px;overflow-y:auto}
        .log{padding:3px;border-bottom:1px solid #333;font-family:monospace}
        .steps{display:grid;grid-template-columns:repeat(5,1fr);gap:5px;margin:10px 0;font-size:12px}
        .step{background:#1a1a2e;padding:5px;border-radius:5px;text-align:center}
        a{color:gold}
    </style>
</head>
<body>
    <div class="container">
        <h1>🎮 PUBG Shorts Bot</h1>
        <div class="badge">✨ REAL PUBG GAMEPLAY ✨</div>

        <div class="steps">
            <div class="step">1️⃣ AI Topic</div>
            <div class="step">2️⃣ Real Footage</div>
            <div class="step">3️⃣ Effects</div>
            <div class="step">4️⃣ Captions + Voice</div>
            <div class="step">5️⃣ YouTube</div>
        </div>

        <div>
            <button class="mode-auto active" id="autoBtn" onclick="setMode('auto')">⏰ Auto</button>
            <button class="mode-manual" id="manualBtn" onclick="setMode('manual')">🖱️ Manual</button>
        </div>

        <button class="run-btn" onclick="runBot()" id="runBtn">🎬 CREATE VIDEO</button>

        <div class="status">
            <div id="statusMsg">Bot ready</div>
            <div class="progress"><div class="bar" id="bar"></div></div>
            <div class="topic" id="topicBox">Topic: --</div>
        </div>

        <div class="stats">
            <div class="stat"><div class="number" id="total">0</div>Total</div>
            <div class="stat"><div class="number" id="topics">0</div>Topics</div>
            <div class="stat"><div class="number" id="last">--:--</div>Last</div>
            <div class="stat"><div class="number" id="next">--:--</div>Next</div>
            <div class="stat"><div class="number" id="queue">0</div>Queue</div>
        </div>

        <div id="videoLink"></div>

        <h3>📋 Job log</h3>
        <div class="logs" id="logs"></div>
    </div>

    <script>
        function text(id, value){document.getElementById(id).textContent=value}
        function update(){
            fetch('/api/status').then(r=>r.json()).then(d=>{
                text('statusMsg', d.message)
                if(d.current_topic) text('topicBox', 'Topic: '+d.current_topic)
                document.getElementById('bar').style.width=d.progress+'%'
                text('total', d.total_videos)
                text('topics', d.topics_generated)
                text('last', d.last_run||'--:--')
                text('next', d.next_run||'--:--')
                text('queue', d.queue_size)

                let auto=document.getElementById('autoBtn')
                let manual=document.getElementById('manualBtn')
                if(d.mode=='auto'){auto.classList.add('active');manual.classList.remove('active')}
                else{manual.classList.add('active');auto.classList.remove('active')}

                document.getElementById('runBtn').disabled=(d.status=='working')

                let link=document.getElementById('videoLink')
                link.textContent=''
                if(d.last_video_url){
                    let a=document.createElement('a')
                    a.href=d.last_video_url
                    a.target='_blank'
                    a.textContent='▶️ '+d.last_video_url
                    link.appendChild(a)
                }

                let logs=document.getElementById('logs')
                logs.textContent=''
                for(const line of d.logs||[]){
                    let div=document.createElement('div')
                    div.className='log'
                    div.textContent=line
                    logs.appendChild(div)
                }
            })
        }
        function setMode(m){fetch('/api/mode/'+m,{method:'POST'}).then(()=>update())}
        function runBot(){
            fetch('/api/run',{method:'POST'}).then(r=>r.json()).then(d=>{
                if(d.error) text('statusMsg', d.error)
                update()
            })
        }
        setInterval(update,2000)
        update()
    </script>
</body>
</html>
"#;

/// Writes the dashboard page into `dir`, replacing any previous copy.
pub async fn write_template(dir: &Path) -> Result<()> {
    let path = dir.join(INDEX_FILE);
    fs::write(&path, INDEX_HTML)
        .await
        .with_context(|| format!("Failed to write dashboard: {}", path.display()))?;
    logok(format!("Dashboard template: {}", path.display()));
    Ok(())
}
