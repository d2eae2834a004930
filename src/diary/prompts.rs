use crate::diary::entry::DiaryEntry;
use std::collections::BTreeMap;

/// Frame one entry with its path header the way every prompt (and the batch
/// token estimate) sees it.
pub fn render_entry(entry: &DiaryEntry) -> String {
    format!("=== {} ===\n{}", entry.path, entry.content)
}

pub fn render_entries(entries: &[DiaryEntry]) -> String {
    entries
        .iter()
        .map(render_entry)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn monthly_prompt(year: i32, month: u32, content: &str) -> String {
    format!(
        "请为以下{year}年{month}月的日记内容生成摘要。\n\n\
要求：\n\
1. 总结这个月的主要事件和经历\n\
2. 提炼出关键的情感和思考\n\
3. 识别重要的变化和发展\n\
4. 保持客观和准确\n\
5. 使用中文输出\n\
6. 摘要长度控制在200-400字\n\n\
日记内容：\n\n\
{content}\n\n\
请生成月度摘要："
    )
}

pub fn yearly_direct_prompt(year: i32, content: &str) -> String {
    format!(
        "请为以下{year}年的日记内容生成一个全面的年度摘要。\n\n\
要求：\n\
1. 总结这一年的主要事件和经历\n\
2. 提炼出关键的情感和思考\n\
3. 识别重要的成长和变化\n\
4. 保持客观和准确\n\
5. 使用中文输出\n\
6. 摘要长度控制在500-1000字\n\n\
日记内容：\n\n\
{content}\n\n\
请生成年度摘要："
    )
}

pub fn yearly_batch_prompt(year: i32, content: &str) -> String {
    format!(
        "请为以下{year}年的部分日记内容生成摘要。\n\n\
要求：\n\
1. 总结这段时期的主要事件和经历\n\
2. 提炼出关键的情感和思考\n\
3. 保持客观和准确\n\
4. 使用中文输出\n\
5. 摘要长度控制在300-500字\n\n\
日记内容：\n\n\
{content}\n\n\
请生成摘要："
    )
}

pub fn yearly_synthesis_prompt(year: i32, batch_summaries: &[String]) -> String {
    let combined = batch_summaries
        .iter()
        .enumerate()
        .map(|(i, summary)| format!("【Part {} Summary】\n{}", i + 1, summary))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "以下是{year}年日记的分段摘要，请基于这些摘要生成一个完整的年度总结。\n\n\
要求：\n\
1. 整合所有分段摘要的内容\n\
2. 总结这一年的主要事件和经历\n\
3. 提炼出关键的情感和思考\n\
4. 识别重要的成长和变化\n\
5. 保持客观和准确\n\
6. 使用中文输出\n\
7. 摘要长度控制在800-1200字\n\n\
分段摘要：\n\n\
{combined}\n\n\
请生成完整的年度总结："
    )
}

pub fn yearly_from_monthly_prompt(year: i32, monthly_summaries: &BTreeMap<u32, String>) -> String {
    let mut combined = String::new();
    for (month, summary) in monthly_summaries {
        combined.push_str(&format!("\n\n【{year} Year {month} Month】\n{summary}"));
    }

    format!(
        "以下是{year}年每个月的日记摘要，请基于这些月度摘要生成一个完整的年度总结。\n\n\
要求：\n\
1. 整合所有月度摘要的内容，总结这一年的主要事件和经历\n\
2. 提炼出关键的情感和思考\n\
3. 识别重要的成长和变化\n\
4. **重点分析：发现周期性的心理活动模式**\n\
   - 识别在不同月份中重复出现的情绪、思考或行为模式\n\
   - 分析这些周期性模式可能的触发因素（季节、特定事件、时间节点等）\n\
   - 总结这些周期性心理活动的特点和演变趋势\n\
5. 保持客观和准确\n\
6. 使用中文输出\n\
7. 摘要长度控制在1000-1500字\n\n\
月度摘要：\n\
{combined}\n\n\
请生成完整的年度总结（包含周期性心理活动分析）："
    )
}
