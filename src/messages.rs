//! Reply templates
//!
//! Every text the bot sends lives here. Replies use WhatsApp markdown
//! (`*bold*`) and are written in Spanish.

use crate::ledger::{Category, SharingType};
use crate::money::{format_number, AmountPolicy};
use crate::state_machine::input::QuickExpenseError;
use chrono::NaiveDate;

pub fn main_menu() -> String {
    "🏦 *GESTOR FINANCIERO PERSONAL*

1️⃣ Ingresar Sueldo
2️⃣ Ingresar Gasto Compartido
3️⃣ Ingresar Gasto Individual
4️⃣ Ver Gastos
5️⃣ Configurar Pareja
6️⃣ Resumen del Mes
7️⃣ Gasto Rápido

Envía el número de la opción 👆
Escribe *menu* en cualquier momento para volver aquí."
        .to_string()
}

/// Text followed by the main menu
pub fn with_menu(text: &str) -> String {
    format!("{text}\n\n{}", main_menu())
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn range_line(policy: AmountPolicy) -> String {
    format!(
        "El monto debe estar entre ${} y ${}.",
        format_number(policy.min),
        format_number(policy.max)
    )
}

pub fn invalid_option() -> String {
    with_menu("❌ Opción no válida.")
}

pub fn generic_error() -> String {
    with_menu("😕 Disculpa, hubo un error. Empecemos de nuevo.")
}

pub fn save_failed() -> String {
    with_menu("❌ Error al guardar. No se registró nada, intenta nuevamente.")
}

pub fn report_failed() -> String {
    with_menu("❌ No pude obtener tus gastos en este momento. Intenta más tarde.")
}

// ============================================================================
// Salary
// ============================================================================

pub fn salary_prompt() -> String {
    "💰 *INGRESAR SUELDO*

Por favor ingresa tu sueldo del mes.

Ejemplos válidos:
• 1400000
• 1.400.000
• 1,400,000

Escribe solo el número:"
        .to_string()
}

pub fn invalid_salary_amount(policy: AmountPolicy) -> String {
    format!(
        "❌ Por favor ingresa un monto válido.

Ejemplos:
• 1400000
• 850000
• 2500000

{}
Escribe solo números (sin letras ni símbolos):",
        range_line(policy)
    )
}

pub fn salary_saved(amount: u64, date: NaiveDate) -> String {
    with_menu(&format!(
        "✅ *SUELDO REGISTRADO*

💰 Monto: ${}
📅 Fecha: {}",
        format_number(amount),
        format_date(date)
    ))
}

// ============================================================================
// Expenses
// ============================================================================

pub fn shared_amount_prompt() -> String {
    "👥 *GASTO COMPARTIDO*

¿Cuánto gastaron entre los dos?

Ejemplos:
• 50000 (supermercado)
• 25000 (cena)
• 150000 (servicios)

Escribe el monto:"
        .to_string()
}

pub fn individual_amount_prompt() -> String {
    "🛍️ *GASTO INDIVIDUAL*

¿Cuánto gastaste solo/a?

Ejemplos:
• 15000 (almuerzo)
• 80000 (ropa)
• 30000 (transporte)

Escribe el monto:"
        .to_string()
}

pub fn invalid_expense_amount(sharing: SharingType, policy: AmountPolicy) -> String {
    let examples = match sharing {
        SharingType::Shared => "50000, 25000, 150000",
        SharingType::Individual => "15000, 80000, 30000",
    };
    format!(
        "❌ Por favor ingresa un monto válido.

Ejemplos: {examples}

{}
Escribe solo números:",
        range_line(policy)
    )
}

pub fn description_prompt(sharing: SharingType, amount: u64) -> String {
    let (question, examples) = match sharing {
        SharingType::Shared => (
            "¿En qué gastaron?",
            "• Supermercado\n• Cena restaurante\n• Servicios casa\n• Transporte",
        ),
        SharingType::Individual => (
            "¿En qué gastaste?",
            "• Almuerzo trabajo\n• Ropa personal\n• Transporte\n• Entretenimiento",
        ),
    };
    format!(
        "💡 *DESCRIPCIÓN DEL GASTO*

Monto: ${}

{question}

Ejemplos:
{examples}

Escribe la descripción:",
        format_number(amount)
    )
}

pub fn empty_description(sharing: SharingType, amount: u64) -> String {
    format!(
        "❌ La descripción no puede estar vacía.\n\n{}",
        description_prompt(sharing, amount)
    )
}

pub fn expense_saved(
    amount: u64,
    description: &str,
    sharing: SharingType,
    category: Option<Category>,
    date: NaiveDate,
) -> String {
    let (title, kind) = match sharing {
        SharingType::Shared => ("✅ *GASTO COMPARTIDO REGISTRADO*", "👥 Tipo: Compartido"),
        SharingType::Individual => ("✅ *GASTO INDIVIDUAL REGISTRADO*", "🛍️ Tipo: Individual"),
    };
    let category_line = category
        .map(|c| format!("\n🏷️ Categoría: {c}"))
        .unwrap_or_default();
    with_menu(&format!(
        "{title}

💰 Monto: ${}
📝 Descripción: {description}
{kind}{category_line}
📅 Fecha: {}",
        format_number(amount),
        format_date(date)
    ))
}

// ============================================================================
// Quick expense
// ============================================================================

fn category_list() -> String {
    Category::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn quick_expense_prompt() -> String {
    format!(
        "⚡ *GASTO RÁPIDO*

Escribe monto, descripción y categoría en un solo mensaje.
Se registra como gasto compartido.

Ejemplo: 25000 cena con amigos comida

Categorías: {}",
        category_list()
    )
}

pub fn quick_expense_error(error: &QuickExpenseError, policy: AmountPolicy) -> String {
    let detail = match error {
        QuickExpenseError::Usage => {
            "❌ Formato: monto descripción categoría\nEjemplo: 25000 cena con amigos comida".to_string()
        }
        QuickExpenseError::Amount => format!("❌ El monto no es válido. {}", range_line(policy)),
        QuickExpenseError::Description => {
            "❌ La descripción debe tener al menos 2 caracteres.".to_string()
        }
        QuickExpenseError::Category(found) => {
            format!("❌ Categoría \"{found}\" no válida.\nCategorías: {}", category_list())
        }
    };
    format!("{detail}\n\nIntenta de nuevo o escribe *menu*.")
}

// ============================================================================
// Partner
// ============================================================================

pub fn partner_name_prompt() -> String {
    "👫 *CONFIGURAR PAREJA*

¿Cómo se llama tu pareja?"
        .to_string()
}

pub fn partner_name_too_short() -> String {
    "❌ El nombre debe tener al menos 2 caracteres.

¿Cómo se llama tu pareja?"
        .to_string()
}

pub fn partner_phone_prompt(name: &str) -> String {
    format!(
        "📱 *NÚMERO DE {}*

¿Cuál es el número de WhatsApp de {name}?

Formato: +54911XXXXXXXX
Ejemplo: +5491123456789

Escribe el número:",
        name.to_uppercase()
    )
}

pub fn invalid_partner_phone(name: &str) -> String {
    format!(
        "❌ Ese número no parece válido.

Escribe el número de {name} con código de país, solo dígitos.
Ejemplo: +5491123456789"
    )
}

pub fn partner_saved(name: &str, phone: &str) -> String {
    with_menu(&format!(
        "✅ *PAREJA CONFIGURADA*

👫 Nombre: {name}
📱 Teléfono: {phone}

Ahora los gastos de {name} también aparecerán en tus reportes del mes."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_lists_every_option() {
        let menu = main_menu();
        for option in ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣"] {
            assert!(menu.contains(option), "missing {option}");
        }
    }

    #[test]
    fn test_expense_saved_contains_details() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let text = expense_saved(50_000, "Supermercado", SharingType::Shared, None, date);
        assert!(text.contains("50.000"));
        assert!(text.contains("Supermercado"));
        assert!(text.contains("Compartido"));
        assert!(text.contains("19/10/2026"));
        assert!(!text.contains("Categoría"));
        assert!(text.ends_with(&main_menu()));
    }

    #[test]
    fn test_range_line_uses_policy() {
        let text = invalid_salary_amount(AmountPolicy::new(1000, 5_000_000));
        assert!(text.contains("$1.000 y $5.000.000"));
    }
}
