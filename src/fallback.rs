//! Static answers used when the upstream model cannot answer in time.
//!
//! `classify` recognises a single elementary function and whether the
//! student asked for its derivative or its integral. Anything else
//! (compositions, coefficients, extra terms, higher order, modifiers
//! spelled out as words) is left unclassified and gets the generic hint
//! instead of a wrong answer.

use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;

/// Calculus operation requested in the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation
{   Derivative
  , Integral
}

/// Elementary functions with a pre-written answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction
{   /// x^3
    Cube
  , /// x^2
    Square
  , /// 1/x
    Reciprocal
  , /// sin(x)
    Sine
  , /// cos(x)
    Cosine
  , /// e^x
    Exponential
  , /// ln(x)
    Logarithm
}

impl MathFunction
{   /// Whether a function name found in the prompt belongs to this family
    fn accepts_name(&self, name: &str) -> bool
    {   match self
        {   MathFunction::Sine => {
              matches!(name, "sin" | "sen" | "seno" | "sine")
            }
          , MathFunction::Cosine => {
              matches!(name, "cos" | "coseno" | "cosine")
            }
          , MathFunction::Exponential => name == "exp"
          , MathFunction::Logarithm => {
              matches!(name, "ln" | "log" | "logarithm" | "logaritmo")
            }
          , _ => false
        }
    }
}

/// Message used when the prompt matches nothing in the catalog
pub const GENERIC_HINT: &str = "The AI service did not answer in time, \
so this reply comes from a small built-in catalog that does not cover \
your question. Try a simpler function, for example the derivative of \
$x^2$ (x squared) or the integral of $\\sin(x)$ (sine of x).";

fn pattern(source: &str) -> Regex
{   Regex::new(source).expect("fallback pattern")
}

static DERIVATIVE: Lazy<Regex> = Lazy::new(|| {
  pattern(r"\bderiv|\bd\s*/\s*dx\b")
});

static INTEGRAL: Lazy<Regex> = Lazy::new(|| {
  pattern(r"\bintegr|\bantideriv|\bprimitiva|∫")
});

static FAMILIES: Lazy<Vec<(MathFunction, Regex)>> = Lazy::new(|| {
  vec![
    ( MathFunction::Cube
    , pattern(
        r"\bx\s*(?:\^|\*\*)\s*(?:3\b|\(\s*3\s*\))|\bx³|\bx\s+(?:cubed|al\s+cubo)\b"
      )
    )
  , ( MathFunction::Square
    , pattern(
        r"\bx\s*(?:\^|\*\*)\s*(?:2\b|\(\s*2\s*\))|\bx²|\bx\s+(?:squared|al\s+cuadrado)\b"
      )
    )
  , ( MathFunction::Reciprocal
    , pattern(
        r"\b1\s*/\s*x\b|\bx\s*(?:\^|\*\*)\s*(?:-\s*1\b|\(\s*-\s*1\s*\))"
      )
    )
  , ( MathFunction::Sine
    , pattern(
        r"\b(?:sin|sen)(?:\s*\(\s*x\s*\)|\s*x\b)|\b(?:sine|seno)\b(?:\s+(?:of|de)\s+x\b)?"
      )
    )
  , ( MathFunction::Cosine
    , pattern(
        r"\bcos(?:\s*\(\s*x\s*\)|\s*x\b)|\b(?:cosine|coseno)\b(?:\s+(?:of|de)\s+x\b)?"
      )
    )
  , ( MathFunction::Exponential
    , pattern(
        r"\be\s*(?:\^|\*\*)\s*(?:\(\s*x\s*\)|x\b)|\bexp\s*\(\s*x\s*\)|\b(?:exponential|exponencial)\b(?:\s+(?:function|funcion))?(?:\s+(?:of|de)\s+x\b)?"
      )
    )
  , ( MathFunction::Logarithm
    , pattern(
        r"\b(?:ln|log)(?:\s*\(\s*x\s*\)|\s*x\b)|\b(?:natural\s+)?(?:logarithm|logaritmo)\b(?:\s+(?:natural|neperiano))?(?:\s+(?:of|de)\s+x\b)?"
      )
    )
  ]
});

// Any named function; one outside the matched family means a
// composition such as sin(x^2).
static FUNCTION_NAMES: Lazy<Regex> = Lazy::new(|| {
  pattern(
    r"\b(?:sinh|cosh|tanh|sin|sen|seno|sine|cos|coseno|cosine|tan|tg|tangent|tangente|exp|ln|log|logarithm|logaritmo|sqrt|raiz|arcsin|arccos|arctan)\b"
  )
});

// Text that carries no math: function labels, differentials, punctuation.
static NOISE: Lazy<Regex> = Lazy::new(|| {
  pattern(
    r"\b[fgy]\s*\(\s*x\s*\)\s*=|\by\s*=|\bd\s*/\s*dx\b|\bdx\b|\b(?:with\s+respect\s+to|respecto\s+(?:al?|de))\s+x\b|[?¿!¡.,;:]"
  )
});

// Math left over once the recognised function is removed.
static LEFTOVER_MATH: Lazy<Regex> = Lazy::new(|| {
  pattern(
    r"\bx\b|\d|[+*/^=²³-]|\b(?:second|segunda|third|tercera|nth|definite|definida|partial|parcial)\b"
  )
});

static WORD: Lazy<Regex> = Lazy::new(|| pattern(r"\p{L}+"));

static OPERATION_WORD: Lazy<Regex> = Lazy::new(|| {
  pattern(r"^(?:deriv|integr|antideriv|primitiva)")
});

// Words allowed around the function; any other word ("squared",
// "times", "inverse", "plus") may change the math.
const FILLER_WORDS: &[&str] = &[
  "a", "an", "the", "of", "for", "to", "is", "what", "whats", "my"
, "find", "compute", "calculate", "evaluate", "solve", "give", "show"
, "me", "please", "can", "you", "how", "do", "i", "get", "take"
, "not", "function", "indefinite", "step", "by", "explain"
, "de", "del", "la", "el", "lo", "las", "los", "es", "cual", "que"
, "calcula", "calcular", "calcule", "halla", "hallar", "encuentra"
, "resuelve", "dame", "muestra", "explica", "por", "favor", "como"
, "se", "mi", "no", "funcion", "indefinida", "paso", "su"
];

fn is_filler(word: &str) -> bool
{   FILLER_WORDS.contains(&word) || OPERATION_WORD.is_match(word)
}

/// Lowercase and strip the diacritics common in Spanish prompts
pub fn fold(prompt: &str) -> String
{   prompt.to_lowercase()
      .chars()
      .map(|c| match c
      {   'á' | 'à' | 'â' | 'ä' => 'a'
        , 'é' | 'è' | 'ê' | 'ë' => 'e'
        , 'í' | 'ì' | 'î' | 'ï' => 'i'
        , 'ó' | 'ò' | 'ô' | 'ö' => 'o'
        , 'ú' | 'ù' | 'û' | 'ü' => 'u'
        , 'ñ' => 'n'
        , 'ç' => 'c'
        , other => other
      })
      .collect()
}

fn detect_operation(text: &str) -> Option<Operation>
{   let derivative = DERIVATIVE.find(text).map(|m| m.start());
    let integral = INTEGRAL.find(text).map(|m| m.start());
    match (derivative, integral)
    {   (Some(d), Some(i)) if i < d => Some(Operation::Integral)
      , (Some(_), _) => Some(Operation::Derivative)
      , (None, Some(_)) => Some(Operation::Integral)
      , (None, None) => None
    }
}

/// Recognise a (function, operation) pair with a catalog answer
pub fn classify(prompt: &str) -> Option<(MathFunction, Operation)>
{   let text = fold(prompt);
    let operation = detect_operation(&text)?;

    let matched: Vec<&(MathFunction, Regex)> = FAMILIES.iter()
      .filter(|(_, re)| re.is_match(&text))
      .collect();
    let (function, family) = match matched.as_slice()
    {   [single] => (single.0, &single.1)
      , _ => {
          debug!("Fallback: {} function families matched", matched.len());
          return None;
        }
    };

    if FUNCTION_NAMES.find_iter(&text)
      .any(|m| !function.accepts_name(m.as_str()))
    {   debug!("Fallback: composed function, no catalog entry");
        return None;
    }

    let remainder = family.replace_all(&text, " ");
    let remainder = NOISE.replace_all(&remainder, " ");
    if LEFTOVER_MATH.is_match(&remainder)
    {   debug!("Fallback: extra terms beyond {:?}", function);
        return None;
    }
    if let Some(word) = WORD.find_iter(&remainder)
      .map(|m| m.as_str())
      .find(|word| !is_filler(word))
    {   debug!("Fallback: unrecognised word {:?}", word);
        return None;
    }

    Some((function, operation))
}

/// Pre-written answer for a catalog entry
pub fn answer(function: MathFunction, operation: Operation) -> &'static str
{   use MathFunction::*;
    use Operation::*;
    match (function, operation)
    {   (Square, Derivative) => r"Step 1: Identify the function: $f(x) = x^2$ (x squared), a power function.
Step 2: Apply the power rule $\frac{d}{dx} x^n = n x^{n-1}$ (bring the exponent down and subtract one from it).
Step 3: Simplify: $2 x^{1} = 2x$ (two x).
Final result: $f'(x) = 2x$ (two x)"
      , (Square, Integral) => r"Step 1: Identify the function: $f(x) = x^2$ (x squared), a power function.
Step 2: Apply the power rule for integrals $\int x^n \, dx = \frac{x^{n+1}}{n+1} + C$ (add one to the exponent and divide by the new exponent).
Step 3: Simplify: $\frac{x^{3}}{3}$ (x cubed over three).
Final result: $\int x^2 \, dx = \frac{x^3}{3} + C$ (x cubed over three plus a constant)"
      , (Cube, Derivative) => r"Step 1: Identify the function: $f(x) = x^3$ (x cubed), a power function.
Step 2: Apply the power rule $\frac{d}{dx} x^n = n x^{n-1}$ (bring the exponent down and subtract one from it).
Step 3: Simplify: $3 x^{2}$ (three x squared).
Final result: $f'(x) = 3x^2$ (three x squared)"
      , (Cube, Integral) => r"Step 1: Identify the function: $f(x) = x^3$ (x cubed), a power function.
Step 2: Apply the power rule for integrals $\int x^n \, dx = \frac{x^{n+1}}{n+1} + C$ (add one to the exponent and divide by the new exponent).
Step 3: Simplify: $\frac{x^{4}}{4}$ (x to the fourth over four).
Final result: $\int x^3 \, dx = \frac{x^4}{4} + C$ (x to the fourth over four plus a constant)"
      , (Reciprocal, Derivative) => r"Step 1: Identify the function: $f(x) = \frac{1}{x} = x^{-1}$ (one over x), a power function.
Step 2: Apply the power rule $\frac{d}{dx} x^n = n x^{n-1}$ with $n = -1$ (exponent minus one).
Step 3: Simplify: $-1 \cdot x^{-2} = -\frac{1}{x^2}$ (minus one over x squared).
Final result: $f'(x) = -\frac{1}{x^2}$ (minus one over x squared)"
      , (Reciprocal, Integral) => r"Step 1: Identify the function: $f(x) = \frac{1}{x}$ (one over x), the one power the power rule does not cover.
Step 2: Use the known antiderivative $\int \frac{1}{x} \, dx = \ln|x| + C$ (natural log of the absolute value of x).
Step 3: The absolute value keeps the result valid for negative x.
Final result: $\int \frac{1}{x} \, dx = \ln|x| + C$ (natural log of absolute x plus a constant)"
      , (Sine, Derivative) => r"Step 1: Identify the function: $f(x) = \sin(x)$ (sine of x), a trigonometric function.
Step 2: Apply the rule $\frac{d}{dx} \sin(x) = \cos(x)$ (the derivative of sine is cosine).
Step 3: No further simplification is needed.
Final result: $f'(x) = \cos(x)$ (cosine of x)"
      , (Sine, Integral) => r"Step 1: Identify the function: $f(x) = \sin(x)$ (sine of x), a trigonometric function.
Step 2: Apply the rule $\int \sin(x) \, dx = -\cos(x) + C$ (the integral of sine is minus cosine).
Step 3: Check: $\frac{d}{dx}(-\cos(x)) = \sin(x)$ (differentiating gives back sine).
Final result: $\int \sin(x) \, dx = -\cos(x) + C$ (minus cosine of x plus a constant)"
      , (Cosine, Derivative) => r"Step 1: Identify the function: $f(x) = \cos(x)$ (cosine of x), a trigonometric function.
Step 2: Apply the rule $\frac{d}{dx} \cos(x) = -\sin(x)$ (the derivative of cosine is minus sine).
Step 3: No further simplification is needed.
Final result: $f'(x) = -\sin(x)$ (minus sine of x)"
      , (Cosine, Integral) => r"Step 1: Identify the function: $f(x) = \cos(x)$ (cosine of x), a trigonometric function.
Step 2: Apply the rule $\int \cos(x) \, dx = \sin(x) + C$ (the integral of cosine is sine).
Step 3: Check: $\frac{d}{dx}\sin(x) = \cos(x)$ (differentiating gives back cosine).
Final result: $\int \cos(x) \, dx = \sin(x) + C$ (sine of x plus a constant)"
      , (Exponential, Derivative) => r"Step 1: Identify the function: $f(x) = e^x$ (e to the x), the natural exponential.
Step 2: Apply the rule $\frac{d}{dx} e^x = e^x$ (the exponential is its own derivative).
Step 3: No further simplification is needed.
Final result: $f'(x) = e^x$ (e to the x)"
      , (Exponential, Integral) => r"Step 1: Identify the function: $f(x) = e^x$ (e to the x), the natural exponential.
Step 2: Apply the rule $\int e^x \, dx = e^x + C$ (the exponential is its own antiderivative).
Step 3: Check: $\frac{d}{dx} e^x = e^x$ (differentiating gives back the same function).
Final result: $\int e^x \, dx = e^x + C$ (e to the x plus a constant)"
      , (Logarithm, Derivative) => r"Step 1: Identify the function: $f(x) = \ln(x)$ (natural logarithm of x), defined for $x > 0$.
Step 2: Apply the rule $\frac{d}{dx} \ln(x) = \frac{1}{x}$ (the derivative of the natural log is one over x).
Step 3: No further simplification is needed.
Final result: $f'(x) = \frac{1}{x}$ (one over x)"
      , (Logarithm, Integral) => r"Step 1: Identify the function: $f(x) = \ln(x)$ (natural logarithm of x), defined for $x > 0$.
Step 2: Integrate by parts with $u = \ln(x)$, $dv = dx$: $\int \ln(x) \, dx = x \ln(x) - \int x \cdot \frac{1}{x} \, dx$ (x times log of x minus the integral of one).
Step 3: Simplify: $x \ln(x) - x$ (x log x minus x).
Final result: $\int \ln(x) \, dx = x \ln(x) - x + C$ (x log x minus x plus a constant)"
    }
}

/// Answer a prompt from the catalog. Never fails.
pub fn respond(prompt: &str) -> String
{   match classify(prompt)
    {   Some((function, operation)) => {
          debug!("Fallback catalog hit: {:?} {:?}", operation, function);
          answer(function, operation).to_string()
        }
      , None => GENERIC_HINT.to_string()
    }
}
