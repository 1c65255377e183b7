use super::classifier::{ classify, Category };
use super::evaluator::{ evaluate, format_number, EvalError };
use log::debug;

const LUA_REPLY: &str = "```lua
-- Пример Lua кода
function greet(name)
  return \"Hello, \" .. name
end

print(greet(\"World\"))
```

Я могу помочь с программированием на Lua! Что именно вас интересует?";

const JAVASCRIPT_REPLY: &str = "```javascript
// Пример JavaScript кода
const greet = (name) => {
  return `Hello, ${name}`;
};

console.log(greet(\"World\"));
```

Готов помочь с JavaScript! Задавайте вопросы.";

const PYTHON_REPLY: &str = "```python
# Пример Python кода
def greet(name):
    return f\"Hello, {name}\"

print(greet(\"World\"))
```

Могу помочь с Python! Какая задача?";

const EVALUATION_FAILED_REPLY: &str = "Попробуйте другое математическое выражение.";

/// Rule-based replies used whenever the chat service cannot answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalResponder;

impl LocalResponder {
    pub fn new() -> Self {
        Self
    }

    pub fn respond(&self, input: &str) -> String {
        let category = classify(input);
        debug!("Local responder category: {:?}", category);
        match category {
            Category::Arithmetic => self.compose(category, Some(evaluate(input.trim())), input),
            other => self.compose(other, None, input),
        }
    }

    /// `evaluation` is only consulted for [`Category::Arithmetic`].
    pub fn compose(
        &self,
        category: Category,
        evaluation: Option<Result<f64, EvalError>>,
        input: &str
    ) -> String {
        match category {
            Category::Lua => LUA_REPLY.to_string(),
            Category::JavaScript => JAVASCRIPT_REPLY.to_string(),
            Category::Python => PYTHON_REPLY.to_string(),
            Category::Arithmetic => match evaluation {
                Some(Ok(value)) => format!(
                    "Результат вычисления: **{}**\n\nМогу решать более сложные математические задачи!",
                    format_number(value)
                ),
                Some(Err(e)) => {
                    debug!("Arithmetic fallback failed: {}", e);
                    EVALUATION_FAILED_REPLY.to_string()
                }
                None => EVALUATION_FAILED_REPLY.to_string(),
            },
            Category::Unrecognized => format!(
                "Я обработал ваш запрос: \"{}\"\n\nЯ поддерживаю:\n• Lua, JavaScript, Python\n• Математические вычисления\n• Обучение от пользователя\n\nЗадайте мне вопрос по программированию или математике!",
                input
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lua_question_gets_lua_code_block() {
        let reply = LocalResponder::new().respond("Привет, есть пример на lua?");
        assert!(reply.starts_with("```lua\n"));
        assert!(reply.contains("Что именно вас интересует?"));
    }

    #[test]
    fn language_templates_carry_their_own_fence() {
        let responder = LocalResponder::new();
        assert!(responder.respond("js promises").contains("```javascript"));
        assert!(responder.respond("python list").contains("```python"));
    }

    #[test]
    fn arithmetic_embeds_result() {
        let reply = LocalResponder::new().respond("3*4");
        assert!(reply.contains("**12**"));
    }

    #[test]
    fn failed_evaluation_apologises() {
        let responder = LocalResponder::new();
        assert_eq!(responder.respond("10/0"), EVALUATION_FAILED_REPLY);
        assert_eq!(responder.respond("сколько будет 1+2+3"), EVALUATION_FAILED_REPLY);
    }

    #[test]
    fn unrecognized_echoes_input_and_lists_capabilities() {
        let reply = LocalResponder::new().respond("случайный текст");
        assert!(reply.contains("\"случайный текст\""));
        assert!(reply.contains("Lua, JavaScript, Python"));
        assert!(reply.contains("Математические вычисления"));
    }

    #[test]
    fn replies_are_never_empty_and_repeatable() {
        let responder = LocalResponder::new();
        for input in ["lua", "js", "python", "2+2", "10/0", "", "что-то ещё"] {
            let first = responder.respond(input);
            assert!(!first.is_empty());
            assert_eq!(first, responder.respond(input));
        }
    }

    #[test]
    fn compose_without_evaluation_falls_back() {
        let reply = LocalResponder::new().compose(Category::Arithmetic, None, "1+1");
        assert_eq!(reply, EVALUATION_FAILED_REPLY);
    }
}
