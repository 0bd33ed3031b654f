//! Line items from field-bag columns, or from DANFE product rows.

use tracing::debug;

use super::aliases::line_item;
use super::amounts::normalize_currency;
use super::patterns::PRODUCT_ROW;
use crate::models::field_bag::RawFieldBag;
use crate::models::invoice::{LineItem, LineItemRaw};

type Column<'a> = Option<&'a [Option<String>]>;

fn cell(column: Column<'_>, index: usize) -> Option<String> {
    column.and_then(|c| c.get(index)).cloned().flatten()
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

/// Assemble one item per index across the line-item columns.
///
/// Indexes run to the longest column. An index is skipped only when both
/// code and description are empty; the description falls back to the
/// generic `line_item` column.
pub fn line_items_from_bag(bag: &RawFieldBag) -> Vec<LineItem> {
    let code = bag.column(line_item::CODE);
    let description = bag.column(line_item::DESCRIPTION);
    let fallback = bag.column(line_item::FALLBACK_DESCRIPTION);
    let quantity = bag.column(line_item::QUANTITY);
    let unit = bag.column(line_item::UNIT);
    let unit_price = bag.column(line_item::UNIT_PRICE);
    let amount = bag.column(line_item::AMOUNT);
    let ncm = bag.column(line_item::NCM);
    let cfop = bag.column(line_item::CFOP);

    let rows = [code, description, fallback, quantity, unit, unit_price, amount, ncm, cfop]
        .iter()
        .flatten()
        .map(|c| c.len())
        .max()
        .unwrap_or(0);

    let mut items = Vec::new();

    for i in 0..rows {
        let raw = LineItemRaw {
            codigo: cell(code, i),
            descricao: cell(description, i),
            quantidade: cell(quantity, i),
            unidade: cell(unit, i),
            valor_unitario: cell(unit_price, i),
            valor_total: cell(amount, i),
            ncm: cell(ncm, i),
            cfop: cell(cfop, i),
            line_item: cell(fallback, i),
        };

        let codigo = trimmed(&raw.codigo);
        let mut descricao = trimmed(&raw.descricao);
        if descricao.is_empty() {
            descricao = trimmed(&raw.line_item);
        }

        if codigo.is_empty() && descricao.is_empty() {
            continue;
        }

        items.push(LineItem {
            codigo,
            descricao,
            quantidade: trimmed(&raw.quantidade),
            unidade: trimmed(&raw.unidade),
            valor_unitario: normalize_currency(&trimmed(&raw.valor_unitario)),
            valor_total: normalize_currency(&trimmed(&raw.valor_total)),
            ncm: trimmed(&raw.ncm),
            cfop: trimmed(&raw.cfop),
            raw,
        });
    }

    debug!("Field bag produced {} line items from {} rows", items.len(), rows);
    items
}

/// Parse DANFE product rows:
/// `code description NCM CST CFOP unit quantity unit-price total`.
pub fn line_items_from_text(text: &str) -> Vec<LineItem> {
    PRODUCT_ROW
        .captures_iter(text)
        .map(|caps| {
            let col = |i: usize| caps.get(i).map(|m| m.as_str().trim().to_string());

            let raw = LineItemRaw {
                codigo: col(1),
                descricao: col(2),
                ncm: col(3),
                cfop: col(5),
                unidade: col(6),
                quantidade: col(7),
                valor_unitario: col(8),
                valor_total: col(9),
                line_item: col(0),
            };

            LineItem {
                codigo: trimmed(&raw.codigo),
                descricao: trimmed(&raw.descricao),
                quantidade: trimmed(&raw.quantidade),
                unidade: trimmed(&raw.unidade),
                valor_unitario: normalize_currency(&trimmed(&raw.valor_unitario)),
                valor_total: normalize_currency(&trimmed(&raw.valor_total)),
                ncm: trimmed(&raw.ncm),
                cfop: trimmed(&raw.cfop),
                raw,
            }
        })
        .collect()
}
