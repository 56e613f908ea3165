use std::sync::OnceLock;

use crate::models::AnswerValue;

// --- Variants ---

/// The two questionnaire layouts. They store into different tables with
/// different delimiters and are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    /// Plain questionnaire with "other" follow-ups, no recommendation.
    Classic,
    /// Questionnaire followed by a model recommendation and a report.
    Advisor,
}

impl Variant {
    pub fn table_name(self) -> &'static str {
        match self {
            Variant::Classic => "user_responses",
            Variant::Advisor => "advisor_responses",
        }
    }

    /// Separator used to store multi-choice answers in one column.
    pub fn delimiter(self) -> &'static str {
        match self {
            Variant::Classic => ", ",
            Variant::Advisor => ",",
        }
    }

    pub fn recommends(self) -> bool {
        matches!(self, Variant::Advisor)
    }

    pub fn schema(self) -> &'static Schema {
        static CLASSIC: OnceLock<Schema> = OnceLock::new();
        static ADVISOR: OnceLock<Schema> = OnceLock::new();
        match self {
            Variant::Classic => CLASSIC.get_or_init(|| Schema::build(Variant::Classic)),
            Variant::Advisor => ADVISOR.get_or_init(|| Schema::build(Variant::Advisor)),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Classic => write!(f, "classic"),
            Variant::Advisor => write!(f, "advisor"),
        }
    }
}

// --- Field model ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    SingleChoice,
    MultiChoice,
    FreeText,
    Integer,
}

impl FieldKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Integer => "INTEGER",
            _ => "TEXT",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Options {
    None,
    Fixed(&'static [&'static str]),
    /// Resolved from the current `education_level` answer.
    ByEducationLevel,
}

#[derive(Debug, Clone, Copy)]
pub enum Condition {
    NotEquals(&'static str),
    OneOf(&'static [&'static str]),
    Contains(&'static str),
}

impl Condition {
    /// An unanswered controlling field never activates its dependants.
    pub fn holds(&self, value: Option<&AnswerValue>) -> bool {
        match (self, value) {
            (_, None) => false,
            (Condition::NotEquals(v), Some(AnswerValue::Text(t))) => t != v,
            (Condition::OneOf(vs), Some(AnswerValue::Text(t))) => vs.contains(&t.as_str()),
            (Condition::Contains(v), Some(AnswerValue::List(items))) => {
                items.iter().any(|item| item == v)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Dependency {
    pub field: &'static str,
    pub condition: Condition,
}

#[derive(Debug, Clone)]
pub struct QuestionField {
    pub id: &'static str,
    /// Short label used in summaries and echoes.
    pub label: &'static str,
    pub prompt: &'static str,
    pub kind: FieldKind,
    pub options: Options,
    pub range: Option<(i64, i64)>,
    pub placeholder: Option<&'static str>,
    pub depends_on: Option<Dependency>,
    pub required: bool,
}

impl QuestionField {
    fn new(id: &'static str, label: &'static str, prompt: &'static str, kind: FieldKind) -> Self {
        Self {
            id,
            label,
            prompt,
            kind,
            options: Options::None,
            range: None,
            placeholder: None,
            depends_on: None,
            required: true,
        }
    }

    fn choices(mut self, options: &'static [&'static str], placeholder: &'static str) -> Self {
        self.options = Options::Fixed(options);
        self.placeholder = Some(placeholder);
        self
    }

    fn multi(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    fn range(mut self, min: i64, max: i64) -> Self {
        self.range = Some((min, max));
        self
    }

    fn depends_on(mut self, field: &'static str, condition: Condition) -> Self {
        self.depends_on = Some(Dependency { field, condition });
        self
    }

    fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

// --- Option sets ---

const AGE_GROUPS: &[&str] = &[
    "15 - 18", "18 - 22", "22 - 30", "30 - 40", "41 - 50", "51 - 65", "65+",
];
const MARITAL_STATUSES: &[&str] = &["Single", "Married", "Divorced", "Widowed"];
const EDUCATION_LEVELS: &[&str] = &[
    "High School",
    "Undergraduate",
    "Graduate",
    "Postgraduate",
    "PhD",
];

const STUDY_HIGH_SCHOOL: &[&str] = &["Science", "Commerce", "Arts", "Humanities", "Medicine"];
const STUDY_UNDERGRADUATE: &[&str] = &[
    "Science", "Commerce", "Arts", "Humanities", "Law", "IT", "Engineering", "Business", "Medicine",
];
const STUDY_GRADUATE: &[&str] = &[
    "Science", "Commerce", "Arts", "Humanities", "Law", "IT", "Engineering", "Business", "Medicine",
    "Social Sciences",
];

const EMPLOYMENT_STATUSES: &[&str] = &[
    "Student",
    "Intern",
    "Unemployed",
    "Employed",
    "Self-employed",
];
const WORKING_STATUSES: &[&str] = &["Employed", "Self-employed"];
const EXPERIENCE_CLASSIC: &[&str] = &["0", "1-2", "3-5", "5+"];
const EXPERIENCE_ADVISOR: &[&str] = &["0-2", "3-5", "5+"];

const MONTHLY_EARNINGS: &[&str] = &[
    "< 20,000 PKR",
    "20,000 - 50,000 PKR",
    "50,000 - 100,000 PKR",
    "100,000 - 200,000 PKR",
    "200,000 - 500,000 PKR",
    "500,000+ PKR",
];

// Multi-choice options must never contain "," so both delimiters stay unambiguous.
const HARD_SKILLS: &[&str] = &[
    "Programming (Python/Java/etc.)",
    "Web Development",
    "Data Science & Machine Learning",
    "Cloud Computing",
    "Software Development",
    "Project Management",
    "Design (UI/UX/Graphic Design)",
    "Marketing & Digital Marketing",
    "Accounting & Finance",
    "Human Resources (HR)",
    "Legal Knowledge & Practices",
    "Sales & Customer Support",
    "Content Creation (Writing/Blogging/etc.)",
];
const SOFT_SKILLS: &[&str] = &[
    "Leadership",
    "Communication",
    "Problem Solving",
    "Teamwork",
    "Time Management",
    "Adaptability",
    "Critical Thinking",
];
const LANGUAGES: &[&str] = &["English", "Urdu", "Arabic", "Chinese", "French"];
const CAREER_FIELDS: &[&str] = &[
    "Technology",
    "Business",
    "Healthcare",
    "Education",
    "Government",
    "Others",
];
const WORK_TYPES: &[&str] = &["Remote", "On-site", "Hybrid"];
const WORK_SCHEDULES: &[&str] = &[
    "Full-time",
    "Part-time",
    "Project-based",
    "Freelance",
    "Temporary",
];
const ASPIRATIONS: &[&str] = &[
    "Businessman",
    "Bureaucrat",
    "Finance Professional",
    "Doctor",
    "IT Professional",
    "Lawyer",
    "Engineer",
    "Pilot",
    "Other",
];

// --- Schema ---

#[derive(Debug)]
pub struct Schema {
    variant: Variant,
    fields: Vec<QuestionField>,
}

impl Schema {
    fn build(variant: Variant) -> Self {
        use FieldKind::*;

        let mut fields = vec![
            QuestionField::new("age_group", "Age Group", "Select your age group", SingleChoice)
                .choices(AGE_GROUPS, "Select Age Group"),
            QuestionField::new(
                "marital_status",
                "Marital Status",
                "What is your marital status?",
                SingleChoice,
            )
            .choices(MARITAL_STATUSES, "Select Marital Status"),
            QuestionField::new(
                "dependants",
                "Dependants",
                "How many dependants do you have?",
                Integer,
            )
            .range(0, 10)
            .depends_on("marital_status", Condition::NotEquals("Single")),
            QuestionField::new(
                "education_level",
                "Education Level",
                "What is your highest level of education?",
                SingleChoice,
            )
            .choices(EDUCATION_LEVELS, "Select Education Level"),
            QuestionField::new(
                "fields_of_study",
                "Fields of Study",
                "What is your field of study? (Select one or more)",
                MultiChoice,
            )
            .multi(Options::ByEducationLevel),
            QuestionField::new(
                "employment_status",
                "Employment Status",
                "What is your current employment status?",
                SingleChoice,
            )
            .choices(EMPLOYMENT_STATUSES, "Select Employment Status"),
        ];

        let experience = QuestionField::new(
            "years_of_experience",
            "Years of Experience",
            "How many years of professional experience do you have?",
            SingleChoice,
        );
        fields.push(match variant {
            Variant::Classic => experience
                .choices(EXPERIENCE_CLASSIC, "Select Experience")
                .depends_on("employment_status", Condition::OneOf(WORKING_STATUSES)),
            Variant::Advisor => experience.choices(EXPERIENCE_ADVISOR, "Select Experience"),
        });

        fields.extend([
            QuestionField::new(
                "monthly_earnings",
                "Monthly Earnings",
                "Select your monthly earnings (in PKR)",
                SingleChoice,
            )
            .choices(MONTHLY_EARNINGS, "Select Earnings"),
            QuestionField::new("hard_skills", "Hard Skills", "Select your hard skills", MultiChoice)
                .multi(Options::Fixed(HARD_SKILLS))
                .optional(),
            QuestionField::new("soft_skills", "Soft Skills", "Select your soft skills", MultiChoice)
                .multi(Options::Fixed(SOFT_SKILLS))
                .optional(),
            QuestionField::new(
                "languages",
                "Languages",
                "What languages do you speak?",
                MultiChoice,
            )
            .multi(Options::Fixed(LANGUAGES))
            .optional(),
            QuestionField::new(
                "career_interests",
                "Career Interests",
                "What career fields are you most interested in?",
                MultiChoice,
            )
            .multi(Options::Fixed(CAREER_FIELDS)),
            QuestionField::new(
                "other_career",
                "Other Career Interests",
                "Please specify your career interests",
                FreeText,
            )
            .depends_on("career_interests", Condition::Contains("Others")),
            QuestionField::new(
                "work_type",
                "Work Type",
                "What is your preferred work setup?",
                SingleChoice,
            )
            .choices(WORK_TYPES, "Select Work Type"),
            QuestionField::new(
                "work_schedule",
                "Work Schedule",
                "What type of work schedule do you prefer?",
                SingleChoice,
            )
            .choices(WORK_SCHEDULES, "Select Schedule"),
        ]);

        match variant {
            Variant::Classic => fields.extend([
                QuestionField::new(
                    "future_aspirations",
                    "Future Aspirations",
                    "What do you want to be in future? (Select one or more)",
                    MultiChoice,
                )
                .multi(Options::Fixed(ASPIRATIONS)),
                QuestionField::new(
                    "other_future_career",
                    "Other Future Career",
                    "Please specify your future career aspirations",
                    FreeText,
                )
                .depends_on("future_aspirations", Condition::Contains("Other")),
            ]),
            Variant::Advisor => fields.push(QuestionField::new(
                "future_aspirations",
                "Future Aspirations",
                "What do you want to be in future?",
                FreeText,
            )),
        }

        Self { variant, fields }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn fields(&self) -> &[QuestionField] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&QuestionField> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Study options offered for an education level. Unknown levels get none.
    pub fn fields_of_study_for(education_level: &str) -> &'static [&'static str] {
        match education_level {
            "High School" => STUDY_HIGH_SCHOOL,
            "Undergraduate" => STUDY_UNDERGRADUATE,
            "Graduate" | "Postgraduate" | "PhD" => STUDY_GRADUATE,
            _ => &[],
        }
    }

    /// Column names in insert order, excluding the `id` key.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.id)
    }
}
