//! Structural extraction of scalar fields from DANFE text.
//!
//! Matchers are plain `(field, regex, group)` rows evaluated in table order.
//! Party rows run against the sender, recipient and carrier sections of the
//! text; document rows run against the whole text. The first row that yields
//! a non-empty capture for a field wins.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::models::invoice::{
    AmountField, Field, MetaField, PackageField, PartyField, PartyRole, TaxField,
};

use super::patterns::*;
use super::tax_id::TaxIdExtractor;
use super::FieldExtractor;

/// One row of the document-level table.
pub struct TextMatcher {
    pub field: Field,
    pub pattern: &'static Regex,
    pub group: usize,
}

/// One row of the per-section party table.
pub struct PartyMatcher {
    pub field: PartyField,
    pub pattern: &'static Regex,
    pub group: usize,
}

fn doc(field: Field, pattern: &'static Regex) -> TextMatcher {
    TextMatcher { field, pattern, group: 1 }
}

fn party(field: PartyField, pattern: &'static Regex) -> PartyMatcher {
    PartyMatcher { field, pattern, group: 1 }
}

lazy_static! {
    /// Party rows, in priority order.
    pub static ref PARTY_MATCHERS: Vec<PartyMatcher> = vec![
        party(PartyField::RazaoSocial, &PARTY_NAME_LABELED),
        party(PartyField::RazaoSocial, &PARTY_NAME_HEADER),
        party(PartyField::CnpjCpf, &PARTY_TAX_ID),
        party(PartyField::Endereco, &PARTY_ADDRESS),
        party(PartyField::Municipio, &PARTY_CITY),
        party(PartyField::Uf, &PARTY_STATE),
        party(PartyField::Cep, &PARTY_POSTAL_CODE),
        party(PartyField::Telefone, &PARTY_PHONE),
        party(PartyField::InscricaoEstadual, &PARTY_STATE_REGISTRATION),
    ];

    /// Document rows, in priority order.
    pub static ref DOCUMENT_MATCHERS: Vec<TextMatcher> = vec![
        doc(Field::Meta(MetaField::Numero), &INVOICE_NUMBER_LABELED),
        doc(Field::Meta(MetaField::Numero), &INVOICE_NUMBER),
        doc(Field::Meta(MetaField::Serie), &SERIES),
        doc(Field::Meta(MetaField::ChaveAcesso), &ACCESS_KEY),
        doc(Field::Meta(MetaField::ProtocoloAutorizacao), &AUTHORIZATION_PROTOCOL),
        doc(Field::Meta(MetaField::DataEmissao), &ISSUE_DATE),
        doc(Field::Meta(MetaField::DataSaida), &SHIP_DATE),
        doc(Field::Meta(MetaField::DataVencimento), &DUE_DATE),

        doc(Field::Amount(AmountField::ValorTotal), &TOTAL_INVOICE),
        doc(Field::Amount(AmountField::ValorProdutos), &TOTAL_GOODS),
        doc(Field::Amount(AmountField::ValorFrete), &FREIGHT),
        doc(Field::Amount(AmountField::OutrasDespesas), &OTHER_EXPENSES),
        doc(Field::Amount(AmountField::Desconto), &DISCOUNT),
        doc(Field::Amount(AmountField::ValorSeguro), &INSURANCE),
        doc(Field::Amount(AmountField::ValorIpi), &IPI),
        doc(Field::Amount(AmountField::ValorIcms), &ICMS),
        doc(Field::Amount(AmountField::ValorTributos), &TOTAL_TAXES),

        doc(Field::Tax(TaxField::BaseCalculoIcms), &ICMS_BASE),
        doc(Field::Tax(TaxField::ValorIcms), &ICMS),
        doc(Field::Tax(TaxField::ValorIcmsSt), &ICMS_ST),
        doc(Field::Tax(TaxField::ValorIpi), &IPI),
        doc(Field::Tax(TaxField::ValorTotalTributos), &TOTAL_TAXES),

        doc(Field::Package(PackageField::Quantidade), &VOLUME_QUANTITY),
        doc(Field::Package(PackageField::Quantidade), &VOLUMES),
        doc(Field::Package(PackageField::Especie), &VOLUME_KIND),
        doc(Field::Package(PackageField::Marca), &VOLUME_MARK),
        doc(Field::Package(PackageField::Numeracao), &VOLUME_NUMBERING),
        doc(Field::Package(PackageField::PesoBruto), &GROSS_WEIGHT),
        doc(Field::Package(PackageField::PesoLiquido), &NET_WEIGHT),

        doc(Field::Notes, &NOTES),

        // DANFE receipt stub, used when no section named the sender
        doc(Field::Party(PartyRole::Sender, PartyField::RazaoSocial), &RECEIVED_FROM),
    ];
}

/// Party sections of a document text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sections<'a> {
    pub sender: Option<&'a str>,
    pub recipient: Option<&'a str>,
    pub carrier: Option<&'a str>,
}

impl<'a> Sections<'a> {
    pub fn get(&self, role: PartyRole) -> Option<&'a str> {
        match role {
            PartyRole::Sender => self.sender,
            PartyRole::Recipient => self.recipient,
            PartyRole::Carrier => self.carrier,
        }
    }

    fn set(&mut self, role: PartyRole, text: &'a str) {
        match role {
            PartyRole::Sender => self.sender = Some(text),
            PartyRole::Recipient => self.recipient = Some(text),
            PartyRole::Carrier => self.carrier = Some(text),
        }
    }
}

/// Split text at the first `emitente`, `destinatário` and `transportador`
/// headers. Each section runs to the next header.
///
/// Without any header the whole text is the sender section. When other
/// headers exist but no sender header does, the text before the first
/// header is the sender section.
pub fn split_sections(text: &str) -> Sections<'_> {
    let section_headers: [(PartyRole, &Regex); 3] = [
        (PartyRole::Sender, &SENDER_SECTION),
        (PartyRole::Recipient, &RECIPIENT_SECTION),
        (PartyRole::Carrier, &CARRIER_SECTION),
    ];

    let mut headers: Vec<(usize, PartyRole)> = section_headers
        .iter()
        .filter_map(|(role, re)| re.find(text).map(|m| (m.start(), *role)))
        .collect();

    let mut sections = Sections::default();

    if headers.is_empty() {
        sections.sender = Some(text);
        return sections;
    }

    headers.sort_by_key(|(start, _)| *start);

    if !headers.iter().any(|(_, role)| *role == PartyRole::Sender) {
        let preamble = &text[..headers[0].0];
        if !preamble.trim().is_empty() {
            sections.sender = Some(preamble);
        }
    }

    for (i, (start, role)) in headers.iter().enumerate() {
        let end = headers.get(i + 1).map(|(next, _)| *next).unwrap_or(text.len());
        sections.set(*role, &text[*start..end]);
    }

    sections
}

/// First non-empty capture of `group` over every match of `pattern`.
fn capture(pattern: &Regex, group: usize, text: &str) -> Option<String> {
    pattern.captures_iter(text).find_map(|caps| {
        let value = caps.get(group)?.as_str().trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Run every matcher table over `text`.
///
/// Fields nothing matched are absent from the map. Values are trimmed but
/// otherwise raw; normalization happens after merging with the field bag.
pub fn extract_text_fields(text: &str) -> BTreeMap<Field, String> {
    let mut fields = BTreeMap::new();
    if text.trim().is_empty() {
        return fields;
    }

    let sections = split_sections(text);

    for role in PartyRole::ALL {
        let Some(section) = sections.get(*role) else {
            continue;
        };

        for matcher in PARTY_MATCHERS.iter() {
            let field = Field::Party(*role, matcher.field);
            if fields.contains_key(&field) {
                continue;
            }
            if let Some(value) = capture(matcher.pattern, matcher.group, section) {
                fields.insert(field, value);
            }
        }
    }

    for matcher in DOCUMENT_MATCHERS.iter() {
        if fields.contains_key(&matcher.field) {
            continue;
        }
        if let Some(value) = capture(matcher.pattern, matcher.group, text) {
            fields.insert(matcher.field, value);
        }
    }

    // Unlabeled sender CNPJ: first tax id in the document no other party claimed
    let sender_tax_id = Field::Party(PartyRole::Sender, PartyField::CnpjCpf);
    if !fields.contains_key(&sender_tax_id) {
        let claimed: Vec<String> = [PartyRole::Recipient, PartyRole::Carrier]
            .iter()
            .filter_map(|role| fields.get(&Field::Party(*role, PartyField::CnpjCpf)))
            .map(|v| digits(v))
            .collect();

        let unclaimed = TaxIdExtractor::new()
            .extract_all(text)
            .into_iter()
            .find(|m| !claimed.contains(&m.value));

        if let Some(m) = unclaimed {
            fields.insert(sender_tax_id, m.source);
        }
    }

    debug!("Raw text matched {} fields", fields.len());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DANFE: &str = "\
RECEBEMOS DE ACME LTDA OS PRODUTOS CONSTANTES DA NOTA FISCAL INDICADA
NF-e Nº 000.123.456 Série 1
CHAVE DE ACESSO 3524 0112 3456 7800 0199 5500 1000 0012 3410 0001 2345
PROTOCOLO DE AUTORIZAÇÃO DE USO 135240000012345
EMITENTE
RAZÃO SOCIAL: ACME LTDA
CNPJ: 11.222.333/0001-81
ENDEREÇO: Rua das Flores, 100
MUNICÍPIO: São Paulo UF: SP CEP: 01234-567
FONE: (11) 3333-4444
INSCRIÇÃO ESTADUAL: 123.456.789.110
DESTINATÁRIO / REMETENTE
NOME / RAZÃO SOCIAL: Cliente Exemplo SA
CNPJ / CPF: 529.982.247-25
MUNICÍPIO: Campinas UF: SP
DATA DE EMISSÃO: 01/02/2024
DATA DE SAÍDA/ENTRADA: 02/02/2024
TRANSPORTADOR / VOLUMES TRANSPORTADOS
RAZÃO SOCIAL: Transportes Rápidos Ltda
QUANTIDADE DE VOLUMES 3 ESPÉCIE CAIXA
PESO BRUTO 12,500 PESO LÍQUIDO 11,000
VALOR TOTAL DOS PRODUTOS 1.000,00
VALOR DO FRETE 50,00
VALOR DO ICMS 180,00
VALOR TOTAL DA NOTA 1.180,00

INFORMAÇÕES COMPLEMENTARES: Pedido 4521
";

    fn get(fields: &BTreeMap<Field, String>, key: &str) -> Option<String> {
        fields.get(&key.parse::<Field>().unwrap()).cloned()
    }

    #[test]
    fn test_document_fields() {
        let fields = extract_text_fields(DANFE);

        assert_eq!(get(&fields, "documentMeta.numero"), Some("000.123.456".into()));
        assert_eq!(get(&fields, "documentMeta.serie"), Some("1".into()));
        assert_eq!(get(&fields, "documentMeta.dataEmissao"), Some("01/02/2024".into()));
        assert_eq!(get(&fields, "documentMeta.dataSaida"), Some("02/02/2024".into()));
        assert_eq!(
            get(&fields, "documentMeta.protocoloAutorizacao"),
            Some("135240000012345".into())
        );
        assert_eq!(get(&fields, "amounts.valorTotal"), Some("1.180,00".into()));
        assert_eq!(get(&fields, "amounts.valorProdutos"), Some("1.000,00".into()));
        assert_eq!(get(&fields, "amounts.valorFrete"), Some("50,00".into()));
        assert_eq!(get(&fields, "taxDetail.valorIcms"), Some("180,00".into()));
        assert_eq!(get(&fields, "packageInfo.quantidade"), Some("3".into()));
        assert_eq!(get(&fields, "packageInfo.especie"), Some("CAIXA".into()));
        assert_eq!(get(&fields, "packageInfo.pesoBruto"), Some("12,500".into()));
        assert_eq!(get(&fields, "notes"), Some("Pedido 4521".into()));
        assert_eq!(get(&fields, "documentMeta.dataVencimento"), None);
    }

    #[test]
    fn test_party_sections() {
        let fields = extract_text_fields(DANFE);

        assert_eq!(get(&fields, "sender.razaoSocial"), Some("ACME LTDA".into()));
        assert_eq!(get(&fields, "sender.cnpjCpf"), Some("11.222.333/0001-81".into()));
        assert_eq!(get(&fields, "sender.municipio"), Some("São Paulo".into()));
        assert_eq!(get(&fields, "sender.uf"), Some("SP".into()));
        assert_eq!(get(&fields, "sender.cep"), Some("01234-567".into()));
        assert_eq!(get(&fields, "sender.telefone"), Some("(11) 3333-4444".into()));
        assert_eq!(get(&fields, "recipient.razaoSocial"), Some("Cliente Exemplo SA".into()));
        assert_eq!(get(&fields, "recipient.cnpjCpf"), Some("529.982.247-25".into()));
        assert_eq!(get(&fields, "recipient.municipio"), Some("Campinas".into()));
        assert_eq!(
            get(&fields, "carrier.razaoSocial"),
            Some("Transportes Rápidos Ltda".into())
        );
    }

    #[test]
    fn test_no_headers_means_sender_section() {
        let text = "Série 1 Data de Emissão 01/02/2024 CNPJ 11.222.333/0001-81";
        let sections = split_sections(text);
        assert_eq!(sections.sender, Some(text));
        assert_eq!(sections.recipient, None);

        let fields = extract_text_fields(text);
        assert_eq!(get(&fields, "documentMeta.serie"), Some("1".into()));
        assert_eq!(get(&fields, "documentMeta.dataEmissao"), Some("01/02/2024".into()));
        assert_eq!(get(&fields, "sender.cnpjCpf"), Some("11.222.333/0001-81".into()));
    }

    #[test]
    fn test_preamble_is_sender_without_sender_header() {
        let text = "ACME LTDA\nCNPJ 11.222.333/0001-81\nDESTINATÁRIO\nCPF 529.982.247-25";
        let sections = split_sections(text);

        assert_eq!(sections.sender, Some("ACME LTDA\nCNPJ 11.222.333/0001-81\n"));
        assert_eq!(sections.recipient, Some("DESTINATÁRIO\nCPF 529.982.247-25"));
    }

    #[test]
    fn test_header_words_inside_names_do_not_split() {
        let text = "\
EMITENTE
RAZÃO SOCIAL: Rápido Transportadora Ltda
CNPJ: 11.222.333/0001-81
DESTINATÁRIO
NOME / RAZÃO SOCIAL: Emitente Comércio SA
CPF: 529.982.247-25";
        let fields = extract_text_fields(text);

        assert_eq!(
            get(&fields, "sender.razaoSocial"),
            Some("Rápido Transportadora Ltda".into())
        );
        assert_eq!(get(&fields, "sender.cnpjCpf"), Some("11.222.333/0001-81".into()));
        assert_eq!(
            get(&fields, "recipient.razaoSocial"),
            Some("Emitente Comércio SA".into())
        );
        assert_eq!(get(&fields, "carrier.cnpjCpf"), None);
    }

    #[test]
    fn test_unlabeled_sender_tax_id_skips_recipient() {
        let text = "DESTINATÁRIO\nCPF: 529.982.247-25\nemitido por 11222333000181";
        let fields = extract_text_fields(text);

        assert_eq!(get(&fields, "recipient.cnpjCpf"), Some("529.982.247-25".into()));
        assert_eq!(get(&fields, "sender.cnpjCpf"), Some("11222333000181".into()));
    }

    #[test]
    fn test_labeled_number_beats_symbol() {
        let text = "Número da Nota Fiscal: 4567\nNº 999";
        let fields = extract_text_fields(text);
        assert_eq!(get(&fields, "documentMeta.numero"), Some("4567".into()));
    }

    #[test]
    fn test_receipt_stub_names_sender() {
        let text = "Recebemos de Fornecedora Beta Ltda os produtos constantes da nota";
        let fields = extract_text_fields(text);
        assert_eq!(get(&fields, "sender.razaoSocial"), Some("Fornecedora Beta Ltda".into()));
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_text_fields("   ").is_empty());
    }
}
