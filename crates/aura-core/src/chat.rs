pub const GREETING_TEXT: &str = "Привет!\n\nТы получил персонального AI-тренера, который:\n• Всегда онлайн\n• Готов помочь\n• Фокус на тебе";

pub const PLAN_RECEIVED_TEXT: &str = "План получен. Отобразил упражнения на орбитах.";
pub const PLAN_PROMPT_TEXT: &str =
    "Отлично, давай создадим для тебя план на день. Что хочешь потренировать?";
pub const NETWORK_ERROR_TEXT: &str = "Network error";
pub const EMPTY_REPLY_TEXT: &str = "OK";

pub const PAYMENT_SUCCESS_NOTICE: &str = "Оплата успешно прошла! Теперь вы на Plus.";
pub const PAYMENT_FAILED_NOTICE: &str = "Ошибка оплаты. Попробуйте снова.";
pub const PAYMENT_UNAVAILABLE_NOTICE: &str = "Не удалось открыть оплату. Попробуйте позже.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickReply {
    Question,
    Technique,
    Plan,
}

impl QuickReply {
    pub const ALL: [QuickReply; 3] = [Self::Question, Self::Technique, Self::Plan];

    pub fn label(self) -> &'static str {
        match self {
            Self::Question => "Вопрос",
            Self::Technique => "Техника",
            Self::Plan => "План",
        }
    }

    pub fn reply_text(self) -> &'static str {
        match self {
            Self::Question => "Задавайте ваш вопрос — я готов помочь!",
            Self::Technique => "Пожалуйста, уточни, по какой именно технике тебя интересуют вопросы: техника выполнения какого упражнения или общий принцип тренировок?",
            Self::Plan => "Хочешь упор на силу, скорость, выносливость, гибкость или комплексный подход? Выбери вектор тренировок!",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "question" | "вопрос" => Some(Self::Question),
            "technique" | "техника" => Some(Self::Technique),
            "plan" | "план" => Some(Self::Plan),
            _ => None,
        }
    }
}
