//! Prompt templates for each lesson stage.

use super::{TopicLesson, TopicSteps, TopicTiers};

/// Characters of each lesson quoted in the narration outline.
const OUTLINE_EXCERPT_CHARS: usize = 120;

pub fn discovery(prompt: &str) -> String {
    format!(
        r#"Given the following user prompt, analyze and break down the learning objectives into three tiers:
- Tier 1: The main topic and all essential supporting topics needed to understand the user's prompt.
- Tier 2: Topics that are helpful and often needed to support Tier 1, but not absolutely required.
- Tier 3: Background or related topics that are not important for Tier 1, but useful for deeper understanding or answering questions about Tier 2.

User Prompt: """{prompt}"""

Respond ONLY in JSON format with keys 'tier_1', 'tier_2', 'tier_3', each mapping to a list of topic strings. Example:
{{
    "tier_1": ["main topic", "essential topic 1"],
    "tier_2": ["secondary topic 1", "secondary topic 2"],
    "tier_3": ["background topic 1"]
}}
"#
    )
}

pub fn simplification(tiers: &TopicTiers) -> String {
    format!(
        "You are an expert teacher. For each of the topics below, break it down into 3-5 clear, \
beginner-friendly learning steps. Use simple language, avoid jargon, and only include the topics \
listed. Format your response as valid JSON like this:\n\
{{\n  \"topic1\": [\"step 1\", \"step 2\", ...],\n  \"topic2\": [\"step 1\", ...]\n}}\n\n\
Tier 1 (Main topics): {}\n\
Tier 2 (Supporting topics): {}\n\
Now, provide a breakdown for each topic:",
        list(&tiers.tier_1),
        list(&tiers.tier_2)
    )
}

pub fn teaching(topic: &TopicSteps) -> String {
    let steps: Vec<String> = topic.steps.iter().map(|s| format!("- {}", s)).collect();
    format!(
        r#"You are an expert, friendly teacher. Your goal is to teach the topic "{}" to a total beginner.
Use the following steps as your lesson outline:
{}

For each step, provide a clear, concise explanation in natural language. Include examples or analogies where helpful.
Make the explanation flow like a real mini-lecture, not just bullet points.
Keep the tone engaging, supportive, and simple.
Return the lesson as plain text (not as a list or JSON)."#,
        topic.topic,
        steps.join("\n")
    )
}

pub fn engagement(lesson: &TopicLesson) -> String {
    format!(
        r#"You are an educational expert focused on engagement and attention retention.
Take the following lesson about "{}" and, without changing its factual content, enhance it with engaging, attention-retaining assets:
- Add reflection prompts (e.g., "Pause and think about...").
- Suggest visualizations or mental imagery.
- Insert real-life application thoughts ("Imagine if you...").
- Encourage the user to recall or say something aloud.
- Add supportive, motivational comments at key points.
Do NOT add any quizzes or knowledge checks.
Return the result as a single, natural-flowing lesson (not a list or JSON).
Lesson:
"""{}""""#,
        lesson.topic, lesson.text
    )
}

pub fn narration(
    lessons: &[TopicLesson],
    minutes: f32,
    target_words: usize,
    extra_context: Option<&str>,
) -> String {
    let topics: Vec<&str> = lessons.iter().map(|l| l.topic.as_str()).collect();
    let outline: Vec<String> = lessons
        .iter()
        .map(|l| {
            let excerpt: String = l.text.chars().take(OUTLINE_EXCERPT_CHARS).collect();
            format!("{}: {}", l.topic, excerpt)
        })
        .collect();

    let mut prompt = format!(
        "You are an expert teacher and storyteller creating a script for a highly engaging educational video.\n\
Your task: Write a single, flowing, classroom-style narration covering ALL these topics, with engaging \
transitions and no abrupt jumps. The entire script should take about {minutes} minutes to read aloud \
(aim for ~{target_words} words, DO NOT exceed this length). Make sure to cover each topic in a balanced \
way and make it beginner-friendly.\n\n\
Topics to cover:\n{}\n\
Outline/Notes per topic:\n{}\n",
        topics.join(", "),
        outline.join("\n")
    );

    if let Some(extra) = extra_context {
        prompt.push_str(&format!("\nExtra audience/context info: {}\n", extra));
    }

    prompt.push_str(&format!(
        "\nInstructions:\n\
- Start the part about each topic with a line holding only a short topic label followed by a colon (e.g. \"Photosynthesis:\").\n\
- Apart from those labels, write continuous, natural narration (no bullet points or markdown).\n\
- Include stories, analogies, fun facts, and inviting transitions.\n\
- End with an energetic summary and encouragement to keep learning.\n\
- Write the script now (MAX {target_words} words):\n"
    ));

    prompt
}

pub fn clarification(question: &str, lesson: &str, context: Option<&str>) -> String {
    let extra = context
        .map(|c| format!("\nPrevious conversation/context:\n{}", c))
        .unwrap_or_default();
    format!(
        r#"You are a supportive, expert teacher. A user has just asked a follow-up question about the lesson below.
Lesson:
"""{lesson}"""
User's follow-up question:
"""{question}"""
{extra}
Respond with a clear, concise, and helpful clarification. If the question is ambiguous, politely ask for more details.
If possible, give an additional analogy or example to help the learner understand.
Return your response as plain text (not as a list or JSON)."#
    )
}

fn list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| format!("'{}'", i)).collect();
    format!("[{}]", quoted.join(", "))
}
