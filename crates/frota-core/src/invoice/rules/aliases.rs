//! Field-bag label aliases.
//!
//! Document-understanding services name the same field differently across
//! processors and vendors. Each canonical field gets an ordered list; the
//! first label with a non-empty value wins.

use crate::models::invoice::{
    AmountField, Field, MetaField, PackageField, PartyField, PartyRole, TaxField,
};

/// Ordered field-bag labels for a canonical field.
pub fn aliases(field: Field) -> &'static [&'static str] {
    match field {
        Field::Meta(meta) => meta_aliases(meta),
        Field::Party(role, party) => party_aliases(role, party),
        Field::Amount(amount) => amount_aliases(amount),
        Field::Package(package) => package_aliases(package),
        Field::Tax(tax) => tax_aliases(tax),
        Field::Notes => &["notes", "observacoes", "informacoes_complementares", "remarks"],
    }
}

fn meta_aliases(field: MetaField) -> &'static [&'static str] {
    match field {
        MetaField::Numero => &[
            "invoice_id",
            "invoice_number",
            "numero_nf",
            "numero",
            "nro",
            "nf",
            "document_number",
        ],
        MetaField::Serie => &["invoice_series", "serie", "series"],
        MetaField::ChaveAcesso => &["access_key", "chave_acesso", "chave_nfe", "nfe_key"],
        MetaField::DataEmissao => &["invoice_date", "issue_date", "data_emissao", "dt_emissao"],
        MetaField::DataSaida => &["ship_date", "delivery_date", "data_saida", "data_entrada_saida"],
        MetaField::DataVencimento => &["due_date", "payment_due_date", "data_vencimento", "vencimento"],
        MetaField::ProtocoloAutorizacao => &[
            "authorization_protocol",
            "protocolo_autorizacao",
            "protocolo",
        ],
    }
}

fn party_aliases(role: PartyRole, field: PartyField) -> &'static [&'static str] {
    match (role, field) {
        (PartyRole::Sender, PartyField::RazaoSocial) => &[
            "supplier_name",
            "vendor_name",
            "emitente",
            "emitente_nome",
            "razao_social_emitente",
            "sender_name",
        ],
        (PartyRole::Sender, PartyField::CnpjCpf) => &[
            "supplier_tax_id",
            "vendor_tax_id",
            "cnpj_emitente",
            "emitente_cnpj",
            "supplier_cnpj",
        ],
        (PartyRole::Sender, PartyField::Endereco) => &[
            "supplier_address",
            "vendor_address",
            "endereco_emitente",
        ],
        (PartyRole::Sender, PartyField::Municipio) => &["supplier_city", "municipio_emitente"],
        (PartyRole::Sender, PartyField::Uf) => &["supplier_state", "uf_emitente"],
        (PartyRole::Sender, PartyField::Cep) => &["supplier_postal_code", "cep_emitente"],
        (PartyRole::Sender, PartyField::Telefone) => &["supplier_phone", "telefone_emitente"],
        (PartyRole::Sender, PartyField::InscricaoEstadual) => &[
            "supplier_state_registration",
            "ie_emitente",
        ],

        (PartyRole::Recipient, PartyField::RazaoSocial) => &[
            "receiver_name",
            "customer_name",
            "destinatario",
            "destinatario_nome",
            "razao_social_destinatario",
            "recipient_name",
        ],
        (PartyRole::Recipient, PartyField::CnpjCpf) => &[
            "receiver_tax_id",
            "customer_tax_id",
            "cnpj_destinatario",
            "cpf_destinatario",
            "destinatario_cnpj",
        ],
        (PartyRole::Recipient, PartyField::Endereco) => &[
            "receiver_address",
            "ship_to_address",
            "endereco_destinatario",
        ],
        (PartyRole::Recipient, PartyField::Municipio) => &["receiver_city", "municipio_destinatario"],
        (PartyRole::Recipient, PartyField::Uf) => &["receiver_state", "uf_destinatario"],
        (PartyRole::Recipient, PartyField::Cep) => &["receiver_postal_code", "cep_destinatario"],
        (PartyRole::Recipient, PartyField::Telefone) => &["receiver_phone", "telefone_destinatario"],
        (PartyRole::Recipient, PartyField::InscricaoEstadual) => &[
            "receiver_state_registration",
            "ie_destinatario",
        ],

        (PartyRole::Carrier, PartyField::RazaoSocial) => &[
            "carrier_name",
            "transportadora",
            "transportador",
            "razao_social_transportadora",
        ],
        (PartyRole::Carrier, PartyField::CnpjCpf) => &["carrier_tax_id", "cnpj_transportadora"],
        (PartyRole::Carrier, PartyField::Endereco) => &["carrier_address", "endereco_transportadora"],
        (PartyRole::Carrier, PartyField::Municipio) => &["carrier_city", "municipio_transportadora"],
        (PartyRole::Carrier, PartyField::Uf) => &["carrier_state", "uf_transportadora"],
        (PartyRole::Carrier, PartyField::Cep) => &["carrier_postal_code", "cep_transportadora"],
        (PartyRole::Carrier, PartyField::Telefone) => &["carrier_phone", "telefone_transportadora"],
        (PartyRole::Carrier, PartyField::InscricaoEstadual) => &[
            "carrier_state_registration",
            "ie_transportadora",
        ],
    }
}

fn amount_aliases(field: AmountField) -> &'static [&'static str] {
    match field {
        AmountField::ValorTotal => &[
            "total_amount",
            "invoice_total",
            "valor_total",
            "valor_total_nota",
            "total",
        ],
        AmountField::ValorProdutos => &["net_amount", "products_total", "valor_produtos"],
        AmountField::ValorFrete => &["freight_amount", "valor_frete", "frete"],
        AmountField::OutrasDespesas => &["other_expenses", "outras_despesas"],
        AmountField::Desconto => &["discount_amount", "desconto"],
        AmountField::ValorSeguro => &["insurance_amount", "valor_seguro", "seguro"],
        AmountField::ValorIpi => &["ipi_amount", "valor_ipi"],
        AmountField::ValorIcms => &["icms_amount", "valor_icms"],
        AmountField::ValorTributos => &["total_tax_amount", "tax_amount", "valor_tributos"],
    }
}

fn package_aliases(field: PackageField) -> &'static [&'static str] {
    match field {
        PackageField::Quantidade => &["package_quantity", "quantidade_volumes", "volumes"],
        PackageField::Especie => &["package_type", "especie"],
        PackageField::Marca => &["package_brand", "marca"],
        PackageField::Numeracao => &["package_numbering", "numeracao"],
        PackageField::PesoBruto => &["gross_weight", "peso_bruto"],
        PackageField::PesoLiquido => &["net_weight", "peso_liquido"],
    }
}

fn tax_aliases(field: TaxField) -> &'static [&'static str] {
    match field {
        TaxField::BaseCalculoIcms => &["icms_base", "base_calculo_icms"],
        TaxField::ValorIcms => &["icms_amount", "valor_icms"],
        TaxField::ValorIcmsSt => &["icms_st_amount", "valor_icms_st"],
        TaxField::ValorIpi => &["ipi_amount", "valor_ipi"],
        TaxField::ValorTotalTributos => &["total_tax_amount", "valor_total_tributos", "valor_tributos"],
    }
}

/// Line-item column labels.
pub mod line_item {
    pub const CODE: &[&str] = &["line_item/product_code", "line_item/codigo", "product_code"];
    pub const DESCRIPTION: &[&str] = &["line_item/description", "line_item/descricao", "description"];
    pub const FALLBACK_DESCRIPTION: &[&str] = &["line_item"];
    pub const QUANTITY: &[&str] = &["line_item/quantity", "line_item/quantidade", "quantity"];
    pub const UNIT: &[&str] = &["line_item/unit", "line_item/unidade", "unit"];
    pub const UNIT_PRICE: &[&str] = &["line_item/unit_price", "line_item/valor_unitario", "unit_price"];
    pub const AMOUNT: &[&str] = &["line_item/amount", "line_item/valor_total", "amount"];
    pub const NCM: &[&str] = &["line_item/ncm", "ncm"];
    pub const CFOP: &[&str] = &["line_item/cfop", "cfop"];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_has_aliases() {
        for field in Field::all() {
            assert!(!aliases(field).is_empty(), "no aliases for {}", field);
        }
    }

    #[test]
    fn test_invoice_number_aliases_in_priority_order() {
        let list = aliases(Field::Meta(MetaField::Numero));
        assert_eq!(list[0], "invoice_id");
        assert!(list.contains(&"nro"));
    }

    #[test]
    fn test_party_aliases_do_not_overlap() {
        for field in PartyField::ALL {
            let sender = aliases(Field::Party(PartyRole::Sender, *field));
            let recipient = aliases(Field::Party(PartyRole::Recipient, *field));
            assert!(sender.iter().all(|a| !recipient.contains(a)));
        }
    }
}
