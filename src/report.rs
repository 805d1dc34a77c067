//! Monthly expense report and summary rendering

use crate::ledger::{same_phone, ExpenseRecord, PartnerLink, SharingType};
use crate::money::{format_number, format_signed};
use std::fmt::Write;

/// Everything the summary view needs, gathered by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyReport {
    /// Phone the report was requested for
    pub phone: String,
    /// Expenses of the user and the linked partner in the current month
    pub expenses: Vec<ExpenseRecord>,
    /// Sum of the user's incomes in the current month
    pub income: u64,
    pub partner: Option<PartnerLink>,
    /// Latest salary registered by the partner
    pub partner_salary: Option<u64>,
}

/// Subtotals over a set of expenses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub shared: u64,
    pub individual: u64,
    /// Part of the shared total each party owes
    pub party_share: u64,
}

impl Totals {
    pub fn of(expenses: &[ExpenseRecord]) -> Self {
        expenses.iter().fold(Self::default(), |mut totals, expense| {
            match expense.sharing {
                SharingType::Shared => {
                    totals.shared = totals.shared.saturating_add(expense.amount);
                    totals.party_share = totals.party_share.saturating_add(expense.party_share());
                }
                SharingType::Individual => {
                    totals.individual = totals.individual.saturating_add(expense.amount);
                }
            }
            totals
        })
    }

    pub fn total(&self) -> u64 {
        self.shared.saturating_add(self.individual)
    }
}

const EMPTY: &str = "No hay gastos registrados este mes.";

fn sharing_icon(sharing: SharingType) -> &'static str {
    match sharing {
        SharingType::Shared => "👥",
        SharingType::Individual => "🛍️",
    }
}

fn write_entries(out: &mut String, expenses: &[ExpenseRecord]) {
    for expense in expenses {
        let _ = writeln!(
            out,
            "💰 ${} - {}",
            format_number(expense.amount),
            expense.description
        );
        let category = expense
            .category
            .map(|c| format!(" · {c}"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "📅 {} | {} {}{category}\n",
            expense.timestamp.format("%d/%m/%Y"),
            sharing_icon(expense.sharing),
            expense.sharing
        );
    }
}

/// Per-record listing with shared, individual and grand totals
pub fn format_expenses_report(expenses: &[ExpenseRecord]) -> String {
    let mut out = String::from("📊 *GASTOS DEL MES*\n\n");
    if expenses.is_empty() {
        out.push_str(EMPTY);
        return out;
    }

    write_entries(&mut out, expenses);

    let totals = Totals::of(expenses);
    out.push_str("📈 *RESUMEN:*\n");
    let _ = writeln!(out, "👥 Compartidos: ${}", format_number(totals.shared));
    let _ = writeln!(out, "🛍️ Individuales: ${}", format_number(totals.individual));
    let _ = write!(out, "💯 Total: ${}", format_number(totals.total()));
    out
}

/// Month overview: totals, each party's share and the user's balance
pub fn format_monthly_summary(report: &MonthlyReport) -> String {
    let mut out = String::from("📈 *RESUMEN DEL MES*\n\n");
    let _ = writeln!(out, "💵 Ingresos del mes: ${}", format_number(report.income));

    match &report.partner {
        Some(partner) => {
            let salary = report
                .partner_salary
                .map_or_else(|| "sin registrar".to_string(), |s| format!("${}", format_number(s)));
            let _ = writeln!(out, "👫 Pareja: {} (sueldo: {salary})", partner.partner_name);
        }
        None => out.push_str("👫 Pareja: sin configurar\n"),
    }
    out.push('\n');

    if report.expenses.is_empty() {
        out.push_str(EMPTY);
        return out;
    }

    let totals = Totals::of(&report.expenses);
    let own_individual: u64 = report
        .expenses
        .iter()
        .filter(|e| e.sharing == SharingType::Individual && same_phone(&e.phone, &report.phone))
        .map(|e| e.amount)
        .fold(0, u64::saturating_add);
    let balance = i128::from(report.income) - i128::from(own_individual) - i128::from(totals.party_share);
    let balance = i64::try_from(balance).unwrap_or(if balance < 0 { i64::MIN } else { i64::MAX });

    let _ = writeln!(out, "👥 Compartidos: ${}", format_number(totals.shared));
    let _ = writeln!(out, "🤝 Parte de cada uno: ${}", format_number(totals.party_share));
    let _ = writeln!(out, "🛍️ Individuales: ${}", format_number(totals.individual));
    let _ = writeln!(out, "💯 Total gastos: ${}", format_number(totals.total()));
    let _ = write!(out, "⚖️ Balance: ${}", format_signed(balance));
    out
}
